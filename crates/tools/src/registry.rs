//! Tool executor: name resolution, policy gating, guarded dispatch.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use ayati_domain::config::ToolMode;
use ayati_domain::tool::ToolDefinition;
use ayati_guardrail::PolicyStore;

/// `ctx = {client_id?, run_id?, session_id?}`.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub client_id: Option<String>,
    pub run_id: Option<String>,
    pub session_id: Option<String>,
}

/// `{ok, output?, error?, meta?}`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl ToolResult {
    pub fn ok(output: serde_json::Value) -> Self {
        Self { ok: true, output: Some(output), error: None, meta: None }
    }
    pub fn err(error: impl Into<String>) -> Self {
        Self { ok: false, output: None, error: Some(error.into()), meta: None }
    }
    pub fn err_with_meta(error: impl Into<String>, meta: serde_json::Value) -> Self {
        Self { ok: false, output: None, error: Some(error.into()), meta: Some(meta) }
    }
}

type ExecuteFn = Arc<
    dyn Fn(serde_json::Value, ToolContext) -> Pin<Box<dyn Future<Output = ToolResult> + Send>> + Send + Sync,
>;

#[derive(Clone)]
pub struct RegisteredTool {
    pub definition: ToolDefinition,
    execute: ExecuteFn,
}

/// Ordered map `name -> ToolDefinition`; first registration of a given
/// name wins.
pub struct ToolRegistry {
    order: Vec<String>,
    tools: HashMap<String, RegisteredTool>,
    policy: Arc<PolicyStore>,
}

impl ToolRegistry {
    pub fn new(policy: Arc<PolicyStore>) -> Self {
        Self { order: Vec::new(), tools: HashMap::new(), policy }
    }

    pub fn register<F, Fut>(&mut self, definition: ToolDefinition, execute: F)
    where
        F: Fn(serde_json::Value, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult> + Send + 'static,
    {
        let name = definition.name.clone();
        if self.tools.contains_key(&name) {
            tracing::warn!(tool = %name, "duplicate tool registration dropped, first wins");
            return;
        }
        let execute: ExecuteFn = Arc::new(move |input, ctx| Box::pin(execute(input, ctx)));
        self.order.push(name.clone());
        self.tools.insert(name, RegisteredTool { definition, execute });
    }

    /// All registered definitions, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order.iter().filter_map(|n| self.tools.get(n)).map(|t| t.definition.clone()).collect()
    }

    pub async fn execute(&self, name: &str, input: serde_json::Value, ctx: ToolContext) -> ToolResult {
        let policy = self.policy.current();
        match policy.tool_mode {
            ToolMode::Off => return ToolResult::err("tools are disabled"),
            ToolMode::Allowlist if !self.allowlisted(name) => {
                return ToolResult::err(format!("tool '{name}' is not in the allowlist"));
            }
            _ => {}
        }

        let Some(tool) = self.tools.get(name) else {
            return ToolResult::err(format!("Unknown tool: {name}"));
        };
        (tool.execute)(input, ctx).await
    }

    fn allowlisted(&self, name: &str) -> bool {
        self.policy.current().allowed_tools.contains(name)
    }
}
