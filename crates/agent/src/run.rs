//! The bounded reason/act/verify/reflect/feedback/end state machine
//! driving one run's LLM ↔ tool interaction.

use ayati_domain::config::{AgentLoopConfig, PromptConfig};
use ayati_domain::ids::{RunId, SessionId, StepId, ToolCallId};
use ayati_domain::tool::{ContentPart, Message, MessageContent, Role, ToolCall, ToolDefinition};
use ayati_domain::trace::TraceEvent;
use ayati_journal::event::ToolResultStatus;
use ayati_session::SessionMemoryManager;
use ayati_tools::{ToolContext, ToolRegistry};

use crate::provider::{LlmProvider, TurnOutcome};
use crate::recall::{ContextRecallAgent, CONTEXT_RECALL_TOOL_NAME};
use crate::schema::{build_tool_schema, AGENT_STEP_TOOL_NAME};
use crate::scratchpad::{format_tool_result, render_system_message};
use crate::step::{AgentStepInput, AgentStepPhase, EndStatus, RunState, ScratchpadEntry};

#[derive(Debug, Clone, Copy)]
pub struct RunHandle {
    pub session_id: SessionId,
    pub run_id: RunId,
}

pub struct AgentLoopInput {
    pub client_id: String,
    pub user_content: String,
    pub system_context: String,
    pub static_system_tokens: u64,
    pub dynamic_system_tokens: u64,
    pub run: RunHandle,
    pub provider_name: String,
    pub model_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyKind {
    Final,
    Feedback,
}

#[derive(Debug, Clone)]
pub struct AgentLoopOutcome {
    pub kind: ReplyKind,
    pub content: String,
    pub end_status: Option<EndStatus>,
    pub total_steps: u32,
    pub tool_calls_made: u32,
}

#[derive(thiserror::Error, Debug)]
pub enum AgentLoopError {
    #[error("provider error: {0}")]
    Provider(String),
    #[error("memory error: {0}")]
    Memory(#[from] ayati_domain::error::Error),
}

/// Drive one run to completion. Provider errors propagate (§7); tool
/// failures become ordinary failed tool results and keep the loop going.
pub async fn run_agent_loop(
    cfg: &AgentLoopConfig,
    prompt_cfg: &PromptConfig,
    provider: &dyn LlmProvider,
    tools: &ToolRegistry,
    memory: &SessionMemoryManager,
    recall: &dyn ContextRecallAgent,
    input: AgentLoopInput,
) -> Result<AgentLoopOutcome, AgentLoopError> {
    let mut state = RunState::default();
    let tool_defs: Vec<ToolDefinition> = build_tool_schema(tools.definitions());
    let tool_schema_texts: Vec<String> = tool_defs.iter().map(|t| t.parameters.to_string()).collect();

    let base_system = input.system_context.clone();
    let mut messages = vec![Message::system(base_system.clone()), Message::user(input.user_content.clone())];

    let ctx = ToolContext {
        client_id: Some(input.client_id.clone()),
        run_id: Some(input.run.run_id.to_string()),
        session_id: Some(input.run.session_id.to_string()),
    };

    loop {
        let effective_limit = cfg.effective_limit(state.tool_calls_made);
        if state.step >= effective_limit || state.consecutive_non_act_steps >= cfg.no_progress_limit {
            return Ok(AgentLoopOutcome {
                kind: ReplyKind::Final,
                content: "I've exhausted my reasoning steps. Let me know how you'd like to proceed.".to_string(),
                end_status: Some(EndStatus::Stuck),
                total_steps: state.step,
                tool_calls_made: state.tool_calls_made,
            });
        }
        state.step += 1;

        // Step 1: rebuild the system message from the current scratchpad.
        let rendered = render_system_message(&base_system, &state.scratchpad, &state.approaches_tried);
        messages[0] = Message::system(rendered);

        // Step 2: telemetry — local token estimate of the full turn input.
        let owned_texts: Vec<String> = messages.iter().map(|m| m.content.extract_all_text()).collect();
        let text_refs: Vec<&str> = owned_texts.iter().map(|s| s.as_str()).collect();
        let schema_refs: Vec<&str> = tool_schema_texts.iter().map(|s| s.as_str()).collect();
        let breakdown = ayati_prompt::estimate_message_tokens(prompt_cfg, &text_refs, &schema_refs);
        TraceEvent::ContextSize {
            step: state.step,
            provider: input.provider_name.clone(),
            model: input.model_name.clone(),
            input_tokens: breakdown.total,
            message_tokens: breakdown.message_tokens,
            tool_schema_tokens: breakdown.tool_schema_tokens,
            static_system_tokens: input.static_system_tokens,
            dynamic_system_tokens: input.dynamic_system_tokens,
            runtime_dynamic_tokens: breakdown.total,
        }
        .emit();

        // Step 3: call the provider.
        let outcome = provider.generate_turn(&messages, &tool_defs).await.map_err(AgentLoopError::Provider)?;

        match outcome {
            TurnOutcome::Assistant { content } => {
                // Step 4: direct answer, terminate.
                memory.record_assistant_final(&content)?;
                return Ok(AgentLoopOutcome {
                    kind: ReplyKind::Final,
                    content,
                    end_status: Some(EndStatus::Solved),
                    total_steps: state.step,
                    tool_calls_made: state.tool_calls_made,
                });
            }
            TurnOutcome::ToolCalls { calls, assistant_content } => {
                if calls.is_empty() {
                    // Step 5: empty tool-call turn.
                    return Ok(AgentLoopOutcome {
                        kind: ReplyKind::Final,
                        content: "Empty tool call response.".to_string(),
                        end_status: Some(EndStatus::Stuck),
                        total_steps: state.step,
                        tool_calls_made: state.tool_calls_made,
                    });
                }

                push_assistant_tool_calls(&mut messages, &calls, assistant_content.as_deref());

                if let Some(step_call) = calls.iter().find(|c| c.tool_name == AGENT_STEP_TOOL_NAME) {
                    let outcome =
                        handle_agent_step(step_call, &mut messages, &mut state, tools, recall, memory, &ctx).await?;
                    if let Some(done) = outcome {
                        return Ok(done);
                    }
                } else {
                    // Legacy path: execute every call in order.
                    for call in &calls {
                        let (result_str, ok) = execute_tool_call(call, tools, recall, &ctx).await;
                        record_legacy_tool_turn(memory, state.step, call, ok, &result_str)?;
                        messages.push(Message::tool_result(call.call_id.to_string(), result_str));
                    }
                    state.tool_calls_made += calls.len() as u32;
                    state.consecutive_non_act_steps = 0;
                }
            }
        }
    }
}

fn push_assistant_tool_calls(messages: &mut Vec<Message>, calls: &[ToolCall], assistant_content: Option<&str>) {
    let mut parts = Vec::new();
    if let Some(text) = assistant_content {
        if !text.trim().is_empty() {
            parts.push(ContentPart::Text { text: text.to_string() });
        }
    }
    for call in calls {
        parts.push(ContentPart::ToolUse {
            id: call.call_id.to_string(),
            name: call.tool_name.clone(),
            input: call.arguments.clone(),
        });
    }
    messages.push(Message { role: Role::AssistantToolCalls, content: MessageContent::Parts(parts) });
}

async fn execute_tool_call(
    call: &ToolCall,
    tools: &ToolRegistry,
    recall: &dyn ContextRecallAgent,
    ctx: &ToolContext,
) -> (String, bool) {
    let result = if call.tool_name == CONTEXT_RECALL_TOOL_NAME {
        recall.recall(call.arguments.clone(), ctx.clone()).await
    } else {
        tools.execute(&call.tool_name, call.arguments.clone(), ctx.clone()).await
    };
    let rendered = format_tool_result(&call.tool_name, result.ok, result.output.as_ref(), result.error.as_deref());
    (rendered, result.ok)
}

fn record_legacy_tool_turn(
    memory: &SessionMemoryManager,
    step: u32,
    call: &ToolCall,
    ok: bool,
    rendered: &str,
) -> Result<(), AgentLoopError> {
    let step_id = StepId(step);
    let tool_call_id: ToolCallId = call.call_id.clone();
    memory.record_tool_call(step_id, tool_call_id.clone(), &call.tool_name, call.arguments.clone())?;
    memory.record_tool_result(
        step_id,
        tool_call_id,
        &call.tool_name,
        if ok { ToolResultStatus::Success } else { ToolResultStatus::Failed },
        rendered,
        if ok { None } else { Some(rendered.to_string()) },
        None,
        None,
    )?;
    Ok(())
}

/// Validate and route one `agent_step` call. Returns `Some(outcome)` when
/// the phase (`feedback`/`end`) terminates the run, `None` when the loop
/// should continue.
async fn handle_agent_step(
    step_call: &ToolCall,
    messages: &mut Vec<Message>,
    state: &mut RunState,
    tools: &ToolRegistry,
    recall: &dyn ContextRecallAgent,
    memory: &SessionMemoryManager,
    ctx: &ToolContext,
) -> Result<Option<AgentLoopOutcome>, AgentLoopError> {
    let parsed = serde_json::from_value::<AgentStepInput>(step_call.arguments.clone())
        .ok()
        .filter(|v| v.validate().is_ok());

    let step_input = match parsed {
        Some(v) => v,
        None => {
            messages.push(Message::tool_result(
                step_call.call_id.to_string(),
                r#"{"error":"Invalid agent_step input. Check required fields."}"#.to_string(),
            ));
            return Ok(None);
        }
    };

    let step_id = StepId(state.step);
    match step_input.phase {
        AgentStepPhase::Reason | AgentStepPhase::Verify | AgentStepPhase::Reflect => {
            state.push_scratchpad(ScratchpadEntry {
                step: step_id,
                phase: step_input.phase,
                thinking: step_input.thinking.clone(),
                summary: step_input.summary.clone(),
                tool_result: None,
            });
            if matches!(step_input.phase, AgentStepPhase::Reflect) {
                state.approaches_tried.extend(step_input.approaches_tried.iter().cloned());
            }
            messages.push(Message::tool_result(step_call.call_id.to_string(), r#"{"acknowledged":true}"#.to_string()));
            state.consecutive_non_act_steps += 1;
            Ok(None)
        }
        AgentStepPhase::Act => {
            let action = step_input.action.clone().expect("validated: act requires action");
            let synthetic_id = format!("agent-act-{}-{}", state.step, chrono::Utc::now().timestamp_millis());
            let tool_call =
                ToolCall { call_id: ToolCallId::from(synthetic_id), tool_name: action.tool_name.clone(), arguments: action.tool_input.clone() };
            let (rendered, ok) = execute_tool_call(&tool_call, tools, recall, ctx).await;
            record_legacy_tool_turn(memory, state.step, &tool_call, ok, &rendered)?;
            state.push_scratchpad(ScratchpadEntry {
                step: step_id,
                phase: step_input.phase,
                thinking: step_input.thinking.clone(),
                summary: step_input.summary.clone(),
                tool_result: Some(rendered.clone()),
            });
            messages.push(Message::tool_result(step_call.call_id.to_string(), rendered));
            state.tool_calls_made += 1;
            state.consecutive_non_act_steps = 0;
            Ok(None)
        }
        AgentStepPhase::Feedback => {
            let feedback = step_input.feedback_message.clone().unwrap_or_default();
            memory.record_assistant_feedback(&feedback)?;
            memory.record_agent_step(step_id, step_input.phase, &step_input.summary, step_input.approaches_tried.clone(), None, None)?;
            Ok(Some(AgentLoopOutcome {
                kind: ReplyKind::Feedback,
                content: feedback,
                end_status: None,
                total_steps: state.step,
                tool_calls_made: state.tool_calls_made,
            }))
        }
        AgentStepPhase::End => {
            let message = step_input.end_message.clone().unwrap_or_default();
            let end_status = step_input.end_status;
            memory.record_agent_step(step_id, step_input.phase, &step_input.summary, step_input.approaches_tried.clone(), None, end_status)?;
            Ok(Some(AgentLoopOutcome {
                kind: ReplyKind::Final,
                content: message,
                end_status,
                total_steps: state.step,
                tool_calls_made: state.tool_calls_made,
            }))
        }
    }
}
