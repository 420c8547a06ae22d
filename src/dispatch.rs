//! Dispatch loop
//!
//! One user prompt in, one final answer out. The model either answers in prose or asks
//! for a tool; tool results are fed back until it answers or the turn budget runs out.
//! Nothing reaches the session history unless the dispatch completes.

use crate::constants::*;
use crate::hardening::RetryPolicy;
use crate::logging::DispatchSummary;
use crate::model::GenerativeModel;
use crate::prompt;
use crate::registry::ToolRegistry;
use crate::session::{ConversationSession, Role, Turn};
use crate::str_utils::truncate_for_log;
use crate::tool_call::extract_tool_call;
use crate::types::*;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    AwaitingModel,
    ParsingResponse,
    ToolCallDetected,
    InvokingTool,
    FinalAnswer,
    Done,
}

pub struct ChatEngine {
    model: Arc<dyn GenerativeModel>,
    registry: Arc<ToolRegistry>,
    retry: RetryPolicy,
    max_turns: u32,
    health: Arc<TransportHealth>,
}

impl ChatEngine {
    pub fn new(model: Arc<dyn GenerativeModel>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            model,
            registry,
            retry: RetryPolicy::default(),
            max_turns: DEFAULT_MAX_TURNS,
            health: Arc::new(TransportHealth::default()),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Upper bound on model calls per dispatch. Zero is treated as one.
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    pub fn with_health(mut self, health: Arc<TransportHealth>) -> Self {
        self.health = health;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn health(&self) -> &Arc<TransportHealth> {
        &self.health
    }

    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    /// Runs one user prompt against the session in `slot`.
    ///
    /// The caller holds the session's lock for the whole call, so turns of one
    /// conversation never interleave. On error the stored history is left as it was.
    pub async fn process_chat(
        &self,
        slot: &mut Option<ConversationSession>,
        request: ChatRequest,
    ) -> Result<ChatResponse> {
        let session = ConversationSession::get_or_create(slot, request.persona.as_deref());
        let system = prompt::system_prompt(session.effective_persona(), &self.registry.catalog());

        let mut summary = DispatchSummary::new(self.max_turns);
        let mut pending = vec![Turn::user(request.prompt.as_str())];
        let mut tool_used: Option<String> = None;
        let mut state = DispatchState::AwaitingModel;

        let answer = loop {
            trace_state(&mut state, DispatchState::AwaitingModel);
            let full_prompt = prompt::compose(&system, &session.history, &pending);
            let output = match self.generate(&full_prompt).await {
                Ok(o) => o,
                Err(e) => {
                    summary.model_calls += 1;
                    summary.outcome = "transport_error";
                    summary.log_summary();
                    return Err(e);
                }
            };
            summary.model_calls += 1;
            tracing::debug!(
                "[⚙️] Model output ({} chars): {}",
                output.len(),
                truncate_for_log(&output, 200)
            );

            trace_state(&mut state, DispatchState::ParsingResponse);
            let call = match extract_tool_call(&output) {
                Some(c) => c,
                None => {
                    trace_state(&mut state, DispatchState::FinalAnswer);
                    summary.outcome = "answer";
                    break output.trim().to_string();
                }
            };

            trace_state(&mut state, DispatchState::ToolCallDetected);
            tracing::info!("[🔧] Model requested tool '{}'", call.tool);
            pending.push(Turn::model(output.trim()));

            trace_state(&mut state, DispatchState::InvokingTool);
            let result = self.registry.invoke(&call.tool, &call.parameters).await;
            summary.record_tool(&call.tool, result.success);
            tool_used = Some(call.tool.clone());

            if call.tool == UPDATE_PERSONA_TOOL && result.success {
                let new_persona = match result.data.as_ref().and_then(|d| d.as_str()) {
                    Some(p) => p.to_string(),
                    None => {
                        return Err(JarvisError::internal(
                            "update_persona succeeded without returning a persona",
                        )
                        .into())
                    }
                };
                session.reseed(Some(&new_persona));
                summary.outcome = "persona_update";
                summary.log_summary();
                return Ok(ChatResponse {
                    response: PERSONA_UPDATED_MESSAGE.to_string(),
                    tool_used,
                    persona_update: Some(new_persona),
                });
            }

            pending.push(Turn::user(prompt::tool_result_message(&result, &request.prompt)));

            if summary.model_calls >= self.max_turns {
                tracing::warn!(
                    "[⚙️] Turn budget of {} exhausted, returning fallback",
                    self.max_turns
                );
                summary.outcome = "budget_exhausted";
                break LOOP_FALLBACK_MESSAGE.to_string();
            }
        };

        trace_state(&mut state, DispatchState::Done);
        for turn in pending {
            session.append_turn(turn.role, turn.text);
        }
        if !answer.is_empty() {
            session.append_turn(Role::Model, answer.as_str());
        }
        summary.log_summary();

        Ok(ChatResponse {
            response: answer,
            tool_used,
            persona_update: None,
        })
    }

    /// One model call under the retry policy. Exhaustion surfaces as `ModelTransport`.
    async fn generate(&self, full_prompt: &str) -> Result<String> {
        let model = &self.model;
        let health = &self.health;
        let outcome = self
            .retry
            .execute_with_retry(move || async move {
                let result = model.generate(full_prompt).await;
                match &result {
                    Ok(_) => health.record_success(),
                    Err(_) => health.record_failure(),
                }
                result
            })
            .await;

        outcome.map_err(|e| {
            tracing::error!("[⚙️] Model {} unreachable: {}", self.model.model_name(), e);
            JarvisError::ModelTransport {
                attempts: self.retry.max_attempts(),
                message: e.to_string(),
            }
            .into()
        })
    }
}

fn trace_state(current: &mut DispatchState, next: DispatchState) {
    tracing::debug!("[⚙️] Dispatch state: {:?} -> {:?}", current, next);
    *current = next;
}
