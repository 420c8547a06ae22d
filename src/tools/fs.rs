//! Read-only filesystem tools confined to a sandbox root.

use crate::constants::MAX_READ_FILE_BYTES;
use crate::registry::{tool_fn, ToolDefinition, ToolRegistry};
use crate::tool_schema::{FieldType, InputSchema};
use crate::types::{JarvisError, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const ACCESS_DENIED: &str = "Access denied: Path outside allowed directories";

pub fn register(registry: &mut ToolRegistry, sandbox_root: &Path) -> Result<()> {
    let root = std::fs::canonicalize(sandbox_root).map_err(|e| {
        JarvisError::Configuration(format!(
            "sandbox root {} is not usable: {}",
            sandbox_root.display(),
            e
        ))
    })?;
    let root = Arc::new(root);
    tracing::info!("[📁] File tools sandboxed to {}", root.display());

    let list_root = root.clone();
    registry.register(
        ToolDefinition::new(
            "fs_list",
            "Lists files and directories.",
            InputSchema::new()
                .required("path", FieldType::String)
                .describe("Directory to list, relative to the workspace root."),
        )
        .with_title("List Files"),
        tool_fn(move |params| {
            let root = list_root.clone();
            async move {
                let path = path_param(&params);
                list_dir(&root, &path).await
            }
        }),
    )?;

    let read_root = root;
    registry.register(
        ToolDefinition::new(
            "fs_read",
            "Reads the content of a file.",
            InputSchema::new()
                .required("path", FieldType::String)
                .describe("File to read, relative to the workspace root."),
        )
        .with_title("Read File"),
        tool_fn(move |params| {
            let root = read_root.clone();
            async move {
                let path = path_param(&params);
                read_file(&root, &path).await
            }
        }),
    )
}

fn path_param(params: &serde_json::Map<String, Value>) -> String {
    params
        .get("path")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Canonicalises `requested` against `root` and rejects anything that escapes it.
pub async fn resolve_in_sandbox(root: &Path, requested: &str) -> std::result::Result<PathBuf, String> {
    let candidate = if requested.trim().is_empty() {
        root.to_path_buf()
    } else {
        root.join(requested.trim())
    };

    let resolved = tokio::fs::canonicalize(&candidate)
        .await
        .map_err(|e| format!("Cannot access '{}': {}", requested, e))?;

    if !resolved.starts_with(root) {
        tracing::warn!("[📁] Blocked path outside sandbox: {}", resolved.display());
        return Err(ACCESS_DENIED.to_string());
    }
    Ok(resolved)
}

async fn list_dir(root: &Path, requested: &str) -> std::result::Result<Value, String> {
    let dir = resolve_in_sandbox(root, requested).await?;
    let mut entries = tokio::fs::read_dir(&dir)
        .await
        .map_err(|e| format!("Error listing files: {}", e))?;

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| format!("Error listing files: {}", e))?
    {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = match entry.file_type().await {
            Ok(t) => t.is_dir(),
            Err(_) => false,
        };
        if is_dir {
            name.push('/');
        }
        names.push(name);
    }
    names.sort();
    Ok(Value::String(names.join("\n")))
}

async fn read_file(root: &Path, requested: &str) -> std::result::Result<Value, String> {
    let file = resolve_in_sandbox(root, requested).await?;
    let meta = tokio::fs::metadata(&file)
        .await
        .map_err(|e| format!("Error reading file: {}", e))?;

    if meta.is_dir() {
        return Err(format!("'{}' is a directory", requested));
    }
    if meta.len() > MAX_READ_FILE_BYTES {
        return Err(format!(
            "File too large ({} bytes, limit {} bytes)",
            meta.len(),
            MAX_READ_FILE_BYTES
        ));
    }

    let content = tokio::fs::read_to_string(&file)
        .await
        .map_err(|e| format!("Error reading file: {}", e))?;
    Ok(Value::String(content))
}
