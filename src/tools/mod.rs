//! Built-in tools available to every conversation.

pub mod calculator;
pub mod clipboard;
pub mod fs;
pub mod notes;
pub mod persona;
pub mod system;
pub mod web;

use crate::registry::ToolRegistry;
use crate::types::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ToolsConfig {
    pub sandbox_root: PathBuf,
    pub notepad_path: PathBuf,
    pub client: reqwest::Client,
    /// Per-invocation limit. `None` disables it.
    pub timeout: Option<Duration>,
}

pub fn builtin_registry(config: &ToolsConfig) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new().with_timeout(config.timeout);

    calculator::register(&mut registry)?;
    system::register(&mut registry)?;
    fs::register(&mut registry, &config.sandbox_root)?;
    notes::register(
        &mut registry,
        Arc::new(notes::Notepad::new(config.notepad_path.clone())),
    )?;
    clipboard::register(&mut registry, Arc::new(clipboard::Clipboard::new()))?;
    web::register(&mut registry, config.client.clone())?;
    persona::register(&mut registry)?;

    tracing::info!("[🔧] {} built-in tools registered", registry.len());
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_order() {
        let dir = tempfile::tempdir().unwrap();
        let registry = builtin_registry(&ToolsConfig {
            sandbox_root: dir.path().to_path_buf(),
            notepad_path: dir.path().join("notepad.txt"),
            client: reqwest::Client::new(),
            timeout: Some(Duration::from_secs(60)),
        })
        .unwrap();

        let names: Vec<_> = registry.definitions().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "calculator",
                "get_current_datetime",
                "fs_list",
                "fs_read",
                "save_note",
                "read_notes",
                "clipboard_add",
                "clipboard_read",
                "clipboard_search",
                "clipboard_clear",
                "web_read",
                "update_persona",
            ]
        );
        assert!(registry.catalog().starts_with("1. **'calculator'**: Evaluates"));
    }
}
