//! The tool executor and its built-in tool set.

pub mod fs_tools;
pub mod registry;
pub mod shell_tool;

pub use registry::{ToolContext, ToolRegistry, ToolResult};

use std::sync::Arc;

use ayati_guardrail::{ConfirmationStore, PolicyStore};

/// Build a registry with every built-in tool registered: `fs.read`, `fs.write`, `fs.delete`, `fs.move`, `fs.list`,
/// `shell.exec`.
pub fn builtin_registry(policy: Arc<PolicyStore>, confirmations: Arc<ConfirmationStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new(policy.clone());
    fs_tools::register(&mut registry, policy.clone(), confirmations.clone());
    shell_tool::register(&mut registry, policy, confirmations);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_expected_tools() {
        let policy = Arc::new(PolicyStore::load(None));
        let confirmations = Arc::new(ConfirmationStore::new("CONFIRM:", 60));
        let registry = builtin_registry(policy, confirmations);
        let names: Vec<String> = registry.definitions().iter().map(|d| d.name.clone()).collect();
        for expected in ["fs.read", "fs.write", "fs.delete", "fs.move", "fs.list", "shell.exec"] {
            assert!(names.contains(&expected.to_string()), "missing {expected}");
        }
    }
}
