//! The synthetic `agent_step` tool definition advertised to the LLM
//! alongside the real tools.

use ayati_domain::tool::ToolDefinition;

pub const AGENT_STEP_TOOL_NAME: &str = "agent_step";

pub fn agent_step_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: AGENT_STEP_TOOL_NAME.to_string(),
        description: "Record one reasoning/action/verification step of the agent loop.".to_string(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "phase": {"type": "string", "enum": ["reason", "act", "verify", "reflect", "feedback", "end"]},
                "thinking": {"type": "string"},
                "summary": {"type": "string"},
                "action": {
                    "type": "object",
                    "properties": {
                        "tool_name": {"type": "string"},
                        "tool_input": {"type": "object"}
                    },
                    "required": ["tool_name", "tool_input"]
                },
                "approaches_tried": {"type": "array", "items": {"type": "string"}},
                "feedback_message": {"type": "string"},
                "end_message": {"type": "string"},
                "end_status": {"type": "string", "enum": ["solved", "stuck", "partial"]}
            },
            "required": ["phase", "summary"]
        }),
    }
}

/// Every real tool's schema plus the synthetic `agent_step` tool, in that
/// order — the union advertised to the provider each turn.
pub fn build_tool_schema(tool_defs: Vec<ToolDefinition>) -> Vec<ToolDefinition> {
    let mut all = tool_defs;
    all.push(agent_step_tool_definition());
    all
}
