//! Inbound request lifting: raw JSON bodies into validated domain requests.

use crate::constants::MAX_PROMPT_CHARS;
use crate::types::*;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

lazy_static! {
    static ref JAVASCRIPT_SCHEME: Regex =
        Regex::new(r"(?i)javascript:").expect("javascript scheme regex is valid");
}

/// `POST /chat` body as received. Fields are optional here so that missing ones
/// produce a field-level validation error rather than a generic 422.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChatRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub persona: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    pub session_id: String,
}

/// Validates and sanitizes a chat body. A missing session id yields a fresh one.
pub fn validate_chat_request(raw: RawChatRequest) -> Result<(SessionId, ChatRequest)> {
    let prompt = match raw.prompt {
        Some(p) => p,
        None => return Err(JarvisError::validation("prompt", "Required").into()),
    };

    let len = prompt.chars().count();
    if len == 0 {
        return Err(JarvisError::validation("prompt", "Prompt cannot be empty").into());
    }
    if len > MAX_PROMPT_CHARS {
        return Err(JarvisError::validation("prompt", "Prompt too long").into());
    }
    if prompt.trim().is_empty() {
        return Err(JarvisError::validation("prompt", "Prompt cannot be only whitespace").into());
    }

    let prompt = sanitize_input(&prompt);
    if prompt.is_empty() {
        return Err(JarvisError::validation("prompt", "Prompt is empty after sanitization").into());
    }

    let session_id = match raw.session_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => SessionId::from(id),
        _ => SessionId::new(),
    };

    Ok((
        session_id,
        ChatRequest {
            prompt,
            persona: raw.persona,
        },
    ))
}

/// Strips angle brackets and `javascript:` schemes, then trims.
pub fn sanitize_input(input: &str) -> String {
    let without_tags: String = input.chars().filter(|c| *c != '<' && *c != '>').collect();
    JAVASCRIPT_SCHEME
        .replace_all(&without_tags, "")
        .trim()
        .to_string()
}
