//! The agent step loop: the bounded reason/act/verify/reflect/feedback/end
//! state machine driving LLM ↔ tool interaction, plus the synthetic
//! `agent_step` tool schema and the scratchpad protocol it shares with
//! `ayati-verify`'s gates.

pub mod provider;
pub mod recall;
pub mod run;
pub mod schema;
pub mod scratchpad;
pub mod step;

pub use provider::{LlmProvider, ScriptedProvider, TurnOutcome};
pub use recall::{ContextRecallAgent, NullContextRecallAgent, CONTEXT_RECALL_TOOL_NAME};
pub use run::{run_agent_loop, AgentLoopError, AgentLoopInput, AgentLoopOutcome, ReplyKind, RunHandle};
pub use schema::{agent_step_tool_definition, AGENT_STEP_TOOL_NAME};
pub use step::{AgentStepAction, AgentStepInput, AgentStepPhase, EndStatus, RunState, ScratchpadEntry};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ayati_domain::config::{AgentLoopConfig, PromptConfig};
    use ayati_domain::ids::{RunId, SessionId};
    use ayati_domain::tool::ToolCall;
    use ayati_guardrail::{ConfirmationStore, PolicyStore};
    use ayati_session::{SessionMemoryManager, SessionIndex};

    use super::*;

    fn setup() -> (tempfile::TempDir, SessionMemoryManager, ayati_tools::ToolRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let index = Arc::new(SessionIndex::open(&dir.path().join("memory.sqlite")).unwrap());
        let memory = SessionMemoryManager::new(dir.path().join("sessions"), index);
        let policy = Arc::new(PolicyStore::load(None));
        let confirmations = Arc::new(ConfirmationStore::new("CONFIRM:", 60));
        let tools = ayati_tools::builtin_registry(policy, confirmations);
        (dir, memory, tools)
    }

    fn run_handle() -> RunHandle {
        RunHandle { session_id: SessionId::new(), run_id: RunId::new() }
    }

    /// S3 — a single `agent_step` call with `phase="end"` terminates the
    /// loop with the declared `end_status`.
    #[tokio::test]
    async fn loop_terminates_on_end_phase() {
        let (_dir, memory, tools) = setup();
        memory.begin_run("client-1", "do the thing").unwrap();

        let end_call = ToolCall {
            call_id: "call-1".into(),
            tool_name: AGENT_STEP_TOOL_NAME.to_string(),
            arguments: serde_json::json!({
                "phase": "end",
                "summary": "finished",
                "end_message": "Done.",
                "end_status": "solved"
            }),
        };
        let provider = ScriptedProvider::new(vec![TurnOutcome::ToolCalls { calls: vec![end_call], assistant_content: None }]);

        let loop_cfg = AgentLoopConfig::default();
        let prompt_cfg = PromptConfig::default();
        let recall = NullContextRecallAgent;

        let input = AgentLoopInput {
            client_id: "client-1".to_string(),
            user_content: "do the thing".to_string(),
            system_context: "You are Ayati.".to_string(),
            static_system_tokens: 0,
            dynamic_system_tokens: 0,
            run: run_handle(),
            provider_name: "scripted".to_string(),
            model_name: "scripted-1".to_string(),
        };

        let outcome = run_agent_loop(&loop_cfg, &prompt_cfg, &provider, &tools, &memory, &recall, input).await.unwrap();
        assert_eq!(outcome.content, "Done.");
        assert_eq!(outcome.end_status, Some(EndStatus::Solved));
        assert_eq!(outcome.total_steps, 1);
        assert_eq!(outcome.tool_calls_made, 0);
    }

    #[tokio::test]
    async fn loop_terminates_on_direct_assistant_answer() {
        let (_dir, memory, tools) = setup();
        memory.begin_run("client-1", "hi").unwrap();

        let provider = ScriptedProvider::new(vec![TurnOutcome::Assistant { content: "Hello there.".to_string() }]);
        let loop_cfg = AgentLoopConfig::default();
        let prompt_cfg = PromptConfig::default();
        let recall = NullContextRecallAgent;

        let input = AgentLoopInput {
            client_id: "client-1".to_string(),
            user_content: "hi".to_string(),
            system_context: "You are Ayati.".to_string(),
            static_system_tokens: 0,
            dynamic_system_tokens: 0,
            run: run_handle(),
            provider_name: "scripted".to_string(),
            model_name: "scripted-1".to_string(),
        };

        let outcome = run_agent_loop(&loop_cfg, &prompt_cfg, &provider, &tools, &memory, &recall, input).await.unwrap();
        assert_eq!(outcome.kind, ReplyKind::Final);
        assert_eq!(outcome.content, "Hello there.");
        assert_eq!(outcome.end_status, Some(EndStatus::Solved));
    }

    #[tokio::test]
    async fn empty_tool_call_turn_is_stuck() {
        let (_dir, memory, tools) = setup();
        memory.begin_run("client-1", "hi").unwrap();

        let provider = ScriptedProvider::new(vec![TurnOutcome::ToolCalls { calls: vec![], assistant_content: None }]);
        let loop_cfg = AgentLoopConfig::default();
        let prompt_cfg = PromptConfig::default();
        let recall = NullContextRecallAgent;

        let input = AgentLoopInput {
            client_id: "client-1".to_string(),
            user_content: "hi".to_string(),
            system_context: "You are Ayati.".to_string(),
            static_system_tokens: 0,
            dynamic_system_tokens: 0,
            run: run_handle(),
            provider_name: "scripted".to_string(),
            model_name: "scripted-1".to_string(),
        };

        let outcome = run_agent_loop(&loop_cfg, &prompt_cfg, &provider, &tools, &memory, &recall, input).await.unwrap();
        assert_eq!(outcome.content, "Empty tool call response.");
        assert_eq!(outcome.end_status, Some(EndStatus::Stuck));
    }

    /// Invalid `agent_step` input replies with an error tool message but
    /// does not abort the run — the next scripted turn still runs.
    #[tokio::test]
    async fn invalid_agent_step_input_recovers_on_next_turn() {
        let (_dir, memory, tools) = setup();
        memory.begin_run("client-1", "hi").unwrap();

        let bad_call = ToolCall {
            call_id: "call-1".into(),
            tool_name: AGENT_STEP_TOOL_NAME.to_string(),
            arguments: serde_json::json!({ "phase": "act", "summary": "try" }), // act with no action
        };
        let good_call = ToolCall {
            call_id: "call-2".into(),
            tool_name: AGENT_STEP_TOOL_NAME.to_string(),
            arguments: serde_json::json!({
                "phase": "end",
                "summary": "finished",
                "end_message": "Done.",
                "end_status": "solved"
            }),
        };
        let provider = ScriptedProvider::new(vec![
            TurnOutcome::ToolCalls { calls: vec![bad_call], assistant_content: None },
            TurnOutcome::ToolCalls { calls: vec![good_call], assistant_content: None },
        ]);

        let loop_cfg = AgentLoopConfig::default();
        let prompt_cfg = PromptConfig::default();
        let recall = NullContextRecallAgent;

        let input = AgentLoopInput {
            client_id: "client-1".to_string(),
            user_content: "hi".to_string(),
            system_context: "You are Ayati.".to_string(),
            static_system_tokens: 0,
            dynamic_system_tokens: 0,
            run: run_handle(),
            provider_name: "scripted".to_string(),
            model_name: "scripted-1".to_string(),
        };

        let outcome = run_agent_loop(&loop_cfg, &prompt_cfg, &provider, &tools, &memory, &recall, input).await.unwrap();
        assert_eq!(outcome.content, "Done.");
        assert_eq!(outcome.total_steps, 2);
    }

    #[tokio::test]
    async fn no_progress_limit_aborts_run_as_stuck() {
        let (_dir, memory, tools) = setup();
        memory.begin_run("client-1", "hi").unwrap();

        let reason_call = |i: usize| ToolCall {
            call_id: format!("call-{i}").into(),
            tool_name: AGENT_STEP_TOOL_NAME.to_string(),
            arguments: serde_json::json!({ "phase": "reason", "summary": format!("thinking {i}") }),
        };
        let turns: Vec<TurnOutcome> = (0..6)
            .map(|i| TurnOutcome::ToolCalls { calls: vec![reason_call(i)], assistant_content: None })
            .collect();
        let provider = ScriptedProvider::new(turns);

        let loop_cfg = AgentLoopConfig::default();
        let prompt_cfg = PromptConfig::default();
        let recall = NullContextRecallAgent;

        let input = AgentLoopInput {
            client_id: "client-1".to_string(),
            user_content: "hi".to_string(),
            system_context: "You are Ayati.".to_string(),
            static_system_tokens: 0,
            dynamic_system_tokens: 0,
            run: run_handle(),
            provider_name: "scripted".to_string(),
            model_name: "scripted-1".to_string(),
        };

        let outcome = run_agent_loop(&loop_cfg, &prompt_cfg, &provider, &tools, &memory, &recall, input).await.unwrap();
        assert_eq!(outcome.end_status, Some(EndStatus::Stuck));
        assert!(outcome.total_steps <= loop_cfg.no_progress_limit + 1);
    }
}
