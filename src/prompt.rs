use crate::session::{Role, Turn};
use crate::types::ToolResult;

/// Persona-first system prompt with the tool catalog and the tool-call wire format.
pub fn system_prompt(persona: &str, catalog: &str) -> String {
    format!(
        r#"{persona}

CRITICAL BEHAVIORAL INSTRUCTIONS:
- Maintain your persona's personality, tone, and communication style consistently
- Never break character or revert to generic assistant responses
- Use your persona's specific vocabulary, expressions, and response patterns
- If you don't know something, respond in character with your persona's typical reaction

AVAILABLE TOOLS:
{catalog}

When a tool is needed, reply with ONLY this raw JSON object and nothing else:
{{
  "tool": "tool_name",
  "parameters": {{ "param1": "value1" }}
}}

Remember: Your persona defines WHO you are, not just HOW you help."#
    )
}

/// Full generation prompt: system text, committed history, then the turns of the
/// dispatch in flight, ending with the model cue.
pub fn compose(system: &str, history: &[Turn], pending: &[Turn]) -> String {
    let mut prompt = String::with_capacity(system.len() + 256);
    prompt.push_str(system);
    prompt.push_str("\n\n# CONVERSATION\n");
    for turn in history.iter().chain(pending) {
        let speaker = match turn.role {
            Role::User => "User",
            Role::Model => "Model",
        };
        prompt.push_str(speaker);
        prompt.push_str(": ");
        prompt.push_str(&turn.text);
        prompt.push('\n');
    }
    prompt.push_str("Model:");
    prompt
}

pub fn tool_result_message(result: &ToolResult, original_prompt: &str) -> String {
    let rendered = match serde_json::to_string(result) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Failed to serialize tool result: {}", e);
            format!("{{\"success\":false,\"error\":\"{}\"}}", e)
        }
    };
    format!(
        "Tool Result:\n{}\n\nBased on this result, provide a helpful response to the user's original request: \"{}\"",
        rendered, original_prompt
    )
}
