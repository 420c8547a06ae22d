use crate::constants::NOTEPAD_EMPTY_MESSAGE;
use crate::registry::{tool_fn, ToolDefinition, ToolRegistry};
use crate::tool_schema::{FieldType, InputSchema};
use crate::types::Result;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Append-only notepad file shared by `save_note` and `read_notes`.
pub struct Notepad {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl Notepad {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn save(&self, content: &str) -> std::io::Result<()> {
        let entry = format!("{}: {}\n\n", chrono::Utc::now().to_rfc3339(), content);
        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(entry.as_bytes()).await?;
        file.flush().await
    }

    pub async fn read(&self) -> std::io::Result<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(notes) if !notes.trim().is_empty() => Ok(notes),
            Ok(_) => Ok(NOTEPAD_EMPTY_MESSAGE.to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(NOTEPAD_EMPTY_MESSAGE.to_string())
            }
            Err(e) => Err(e),
        }
    }
}

pub fn register(registry: &mut ToolRegistry, notepad: Arc<Notepad>) -> Result<()> {
    let writer = notepad.clone();
    registry.register(
        ToolDefinition::new(
            "save_note",
            "Saves a note to the notepad.",
            InputSchema::new().required("note_content", FieldType::String),
        )
        .with_title("Save Note"),
        tool_fn(move |params| {
            let notepad = writer.clone();
            async move {
                let content = params
                    .get("note_content")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                notepad
                    .save(content)
                    .await
                    .map_err(|e| format!("Error saving note: {}", e))?;
                Ok(Value::String("Note saved successfully.".to_string()))
            }
        }),
    )?;

    registry.register(
        ToolDefinition::new(
            "read_notes",
            "Reads all notes from the notepad.",
            InputSchema::new(),
        )
        .with_title("Read Notes"),
        tool_fn(move |_params| {
            let notepad = notepad.clone();
            async move {
                notepad
                    .read()
                    .await
                    .map(Value::String)
                    .map_err(|e| format!("Error reading notes: {}", e))
            }
        }),
    )
}
