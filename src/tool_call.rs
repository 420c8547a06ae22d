//! Model-emitted tool calls.
//!
//! The model requests a tool by answering with a single JSON object
//! `{"tool": "<name>", "parameters": {...}}`, optionally wrapped in one fenced code block.
//! Matching is strict: the object (or the fence) must be the whole response. Prose around
//! it makes the response a final answer.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

lazy_static! {
    static ref FENCED_BLOCK: Regex =
        Regex::new(r"^```(?i:json)?\s*([\s\S]*?)\s*```$").expect("fenced block regex is valid");
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    pub parameters: Value,
}

impl ToolCall {
    fn from_object(mut map: Map<String, Value>) -> Option<Self> {
        let tool = match map.remove("tool") {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            _ => return None,
        };

        let parameters = match map.remove("parameters") {
            Some(Value::Null) | None => Value::Object(map),
            Some(p) => p,
        };

        Some(Self { tool, parameters })
    }
}

/// Returns the tool call carried by `text`, or `None` when `text` is a final answer.
pub fn extract_tool_call(text: &str) -> Option<ToolCall> {
    let trimmed = text.trim();
    let object = parse_object(trimmed).or_else(|| {
        let captures = FENCED_BLOCK.captures(trimmed)?;
        parse_object(captures.get(1)?.as_str())
    })?;
    ToolCall::from_object(object)
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
