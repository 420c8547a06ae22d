use crate::constants::UPDATE_PERSONA_TOOL;
use crate::registry::{tool_fn, ToolDefinition, ToolRegistry};
use crate::tool_schema::{FieldType, InputSchema};
use crate::types::Result;
use serde_json::Value;

/// Session-control tool. The implementation only echoes the trimmed prompt; the
/// dispatch loop performs the reseed when it sees a successful result.
pub fn register(registry: &mut ToolRegistry) -> Result<()> {
    registry.register(
        ToolDefinition::new(
            UPDATE_PERSONA_TOOL,
            "Updates the AI's persona for the current session. This is useful for adapting to the user's needs or the context of the conversation.",
            InputSchema::new()
                .required("new_prompt", FieldType::String)
                .describe("The new system prompt for the AI."),
        )
        .with_title("Update Persona"),
        tool_fn(|params| async move {
            match params.get("new_prompt").and_then(Value::as_str).map(str::trim) {
                Some(p) if !p.is_empty() => Ok(Value::String(p.to_string())),
                _ => Err("new_prompt must not be empty".to_string()),
            }
        }),
    )
}
