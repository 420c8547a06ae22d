//! Tool Registry
//!
//! Name → definition + implementation. Built once at startup and shared read-only
//! (`Arc<ToolRegistry>`) by every conversation, so lookups take no locks.

use crate::tool_schema::InputSchema;
use crate::types::{JarvisError, Result, ToolResult};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

pub type ToolFuture = BoxFuture<'static, std::result::Result<Value, String>>;

/// Async tool body. Receives parameters that already passed schema validation.
pub type ToolImplementation = Arc<dyn Fn(Map<String, Value>) -> ToolFuture + Send + Sync>;

/// Wraps an async closure into a [`ToolImplementation`].
pub fn tool_fn<F, Fut>(f: F) -> ToolImplementation
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Value, String>> + Send + 'static,
{
    Arc::new(move |params| f(params).boxed())
}

#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub title: Option<String>,
    pub description: String,
    pub input_schema: InputSchema,
}

impl ToolDefinition {
    pub fn new(name: &str, description: &str, input_schema: InputSchema) -> Self {
        Self {
            name: name.to_string(),
            title: None,
            description: description.to_string(),
            input_schema,
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn listing(&self) -> ToolListing {
        ToolListing {
            name: self.name.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.to_json_schema(),
        }
    }
}

/// Serialized form of a definition (`tools/list`, `GET /tools`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolListing {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Clone)]
pub struct RegisteredTool {
    pub definition: ToolDefinition,
    pub implementation: ToolImplementation,
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
    order: Vec<String>,
    timeout: Option<Duration>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds every invocation; `None` lets a tool run indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|d| !d.is_zero());
        self
    }

    pub fn register(
        &mut self,
        definition: ToolDefinition,
        implementation: ToolImplementation,
    ) -> Result<()> {
        if self.tools.contains_key(&definition.name) {
            return Err(JarvisError::DuplicateTool(definition.name).into());
        }
        tracing::debug!("Registered tool '{}'", definition.name);
        self.order.push(definition.name.clone());
        self.tools.insert(
            definition.name.clone(),
            RegisteredTool {
                definition,
                implementation,
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&RegisteredTool> {
        match self.tools.get(name) {
            Some(tool) => Ok(tool),
            None => Err(JarvisError::ToolNotFound(name.to_string()).into()),
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| &t.definition)
    }

    /// Numbered tool list embedded in the system prompt.
    pub fn catalog(&self) -> String {
        self.definitions()
            .enumerate()
            .map(|(i, def)| {
                format!(
                    "{}. **'{}'**: {}\n   * **Parameters:**\n{}",
                    i + 1,
                    def.name,
                    def.description,
                    def.input_schema.describe_params("  ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Validates and runs a tool. Never fails: every problem becomes a failed [`ToolResult`].
    pub async fn invoke(&self, name: &str, raw_parameters: &Value) -> ToolResult {
        let tool = match self.get(name) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!("[🔧] Unknown tool requested: {}", name);
                return ToolResult::failure(e.to_string());
            }
        };

        let params = match tool.definition.input_schema.validate(raw_parameters) {
            Ok(p) => p,
            Err(details) => {
                tracing::warn!("[🔧] Rejected parameters for {}: {}", name, details);
                return ToolResult::failure(format!("Invalid input: {}", details));
            }
        };

        let started = std::time::Instant::now();
        let call = AssertUnwindSafe((tool.implementation)(params)).catch_unwind();
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(o) => o,
                Err(_) => {
                    tracing::error!("[🔧] Tool {} timed out after {:?}", name, limit);
                    return ToolResult::failure(format!(
                        "Tool '{}' timed out after {}ms",
                        name,
                        limit.as_millis()
                    ));
                }
            },
            None => call.await,
        };

        match outcome {
            Ok(Ok(data)) => {
                tracing::info!("[🔧] Tool {} succeeded in {:?}", name, started.elapsed());
                ToolResult::ok(data)
            }
            Ok(Err(message)) => {
                tracing::warn!("[🔧] Tool {} failed: {}", name, message);
                ToolResult::failure(message)
            }
            Err(payload) => {
                let message = if let Some(s) = payload.downcast_ref::<&str>() {
                    *s
                } else if let Some(s) = payload.downcast_ref::<String>() {
                    s.as_str()
                } else {
                    "Unknown panic payload"
                };
                tracing::error!(target: "panic", "[🔧] Tool {} panicked: {}", name, message);
                ToolResult::failure(format!("Tool '{}' panicked: {}", name, message))
            }
        }
    }
}
