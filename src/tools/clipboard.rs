use crate::constants::{CLIPBOARD_MAX_CHARS, CLIPBOARD_MAX_ITEMS};
use crate::registry::{tool_fn, ToolDefinition, ToolRegistry};
use crate::str_utils::prefix_chars;
use crate::tool_schema::{FieldType, InputSchema};
use crate::types::Result;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

lazy_static! {
    static ref URL: Regex = Regex::new(r"^https?://").expect("url regex is valid");
    static ref EMAIL: Regex = Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
        .expect("email regex is valid");
    static ref NUMBER: Regex = Regex::new(r"^\d+$").expect("number regex is valid");
    static ref COLOR: Regex = Regex::new(r"^(?i)[A-F0-9]{6}$").expect("color regex is valid");
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClipboardItem {
    pub content: String,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

pub fn detect_content_type(text: &str) -> &'static str {
    if URL.is_match(text) {
        "url"
    } else if EMAIL.is_match(text) {
        "email"
    } else if NUMBER.is_match(text) {
        "number"
    } else if COLOR.is_match(text) {
        "color"
    } else if text.chars().count() > 100 {
        "text"
    } else {
        "snippet"
    }
}

/// In-memory clipboard history, newest first.
#[derive(Default)]
pub struct Clipboard {
    items: Mutex<Vec<ClipboardItem>>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, text: &str) -> std::result::Result<String, String> {
        if text.trim().is_empty() {
            return Err("Cannot add empty text to clipboard.".to_string());
        }

        let item = ClipboardItem {
            content: prefix_chars(text, CLIPBOARD_MAX_CHARS).to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            kind: detect_content_type(text),
        };
        let preview = format!("Added to clipboard: \"{}...\"", prefix_chars(&item.content, 30));

        let mut items = self.items.lock().await;
        items.retain(|existing| existing.content != item.content);
        items.insert(0, item);
        items.truncate(CLIPBOARD_MAX_ITEMS);
        Ok(preview)
    }

    pub async fn history(&self) -> Vec<ClipboardItem> {
        self.items.lock().await.clone()
    }

    pub async fn search(&self, query: &str) -> Vec<ClipboardItem> {
        let needle = query.to_lowercase();
        self.items
            .lock()
            .await
            .iter()
            .filter(|item| item.content.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    pub async fn clear(&self) {
        self.items.lock().await.clear();
    }
}

fn str_param(params: &serde_json::Map<String, Value>, key: &str) -> String {
    params
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub fn register(registry: &mut ToolRegistry, clipboard: Arc<Clipboard>) -> Result<()> {
    let cb = clipboard.clone();
    registry.register(
        ToolDefinition::new(
            "clipboard_add",
            "Adds text to the clipboard history.",
            InputSchema::new()
                .required("text", FieldType::String)
                .describe("The text to remember."),
        )
        .with_title("Clipboard Add"),
        tool_fn(move |params| {
            let cb = cb.clone();
            async move { cb.add(&str_param(&params, "text")).await.map(Value::String) }
        }),
    )?;

    let cb = clipboard.clone();
    registry.register(
        ToolDefinition::new(
            "clipboard_read",
            "Reads the clipboard history, newest first.",
            InputSchema::new(),
        )
        .with_title("Clipboard Read"),
        tool_fn(move |_params| {
            let cb = cb.clone();
            async move {
                let items = cb.history().await;
                if items.is_empty() {
                    return Ok(Value::String("Clipboard history is empty.".to_string()));
                }
                serde_json::to_value(items).map_err(|e| e.to_string())
            }
        }),
    )?;

    let cb = clipboard.clone();
    registry.register(
        ToolDefinition::new(
            "clipboard_search",
            "Searches the clipboard history for matching text.",
            InputSchema::new()
                .required("query", FieldType::String)
                .describe("Case-insensitive text to look for."),
        )
        .with_title("Clipboard Search"),
        tool_fn(move |params| {
            let cb = cb.clone();
            async move {
                let query = str_param(&params, "query");
                if query.is_empty() {
                    return Err("Please provide a search query for the clipboard.".to_string());
                }
                let matches = cb.search(&query).await;
                if matches.is_empty() {
                    return Ok(Value::String(format!(
                        "No matches found in clipboard for \"{}\".",
                        query
                    )));
                }
                serde_json::to_value(matches).map_err(|e| e.to_string())
            }
        }),
    )?;

    registry.register(
        ToolDefinition::new(
            "clipboard_clear",
            "Clears the clipboard history.",
            InputSchema::new(),
        )
        .with_title("Clipboard Clear"),
        tool_fn(move |_params| {
            let cb = clipboard.clone();
            async move {
                cb.clear().await;
                Ok(Value::String("Clipboard history cleared.".to_string()))
            }
        }),
    )
}
