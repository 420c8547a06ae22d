#![allow(clippy::manual_unwrap_or_default)]
#![allow(clippy::manual_unwrap_or)]

pub mod constants;
pub mod dispatch;
pub mod hardening;
pub mod health;
pub mod ingress;
pub mod logging;
pub mod main_helper;
pub mod mcp;
pub mod model;
pub mod prompt;
pub mod registry;
pub mod session;
pub mod specs;
pub mod str_utils;
pub mod tool_call;
pub mod tool_schema;
pub mod tools;
pub mod types;

pub use types::*;

pub use main_helper::{AppState, Args};
