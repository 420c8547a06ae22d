use axum::{
    body::Body,
    http::{Request, Response},
    middleware::Next,
};
use colored::*;
use std::panic;
use tracing::{error, info, warn};
use tracing::{info_span, Instrument};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Sets up a global panic hook that logs panics using tracing.
pub fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let backtrace = std::backtrace::Backtrace::capture();

        let payload = panic_info.payload();
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            *s
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.as_str()
        } else {
            "Unknown panic payload"
        };

        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown location".to_string());

        error!(
            target: "panic",
            message = %message,
            location = %location,
            backtrace = %backtrace,
            "FATAL: Application panicked"
        );

        original_hook(panic_info);
    }));
}

/// Tags every request with an id (reusing the caller's `x-request-id` when present)
/// and runs the handler inside a `request` span carrying it.
pub async fn request_id_middleware(mut req: Request<Body>, next: Next) -> Response<Body> {
    let request_id = match req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        Some(id) => id.to_string(),
        None => Uuid::new_v4().to_string(),
    };
    if let Ok(val) = request_id.parse() {
        req.headers_mut().insert(REQUEST_ID_HEADER, val);
    }

    let span = info_span!("request", request_id = %request_id);
    let mut response = next.run(req).instrument(span).await;
    if let Ok(val) = request_id.parse() {
        response.headers_mut().insert(REQUEST_ID_HEADER, val);
    }
    response
}

/// Flight-recorder line for one `process_chat` call.
#[derive(Debug, Default)]
pub struct DispatchSummary {
    pub model_calls: u32,
    pub max_turns: u32,
    pub tools: Vec<String>,
    pub failed_tools: usize,
    pub outcome: &'static str,
}

impl DispatchSummary {
    pub fn new(max_turns: u32) -> Self {
        Self {
            max_turns,
            outcome: "pending",
            ..Default::default()
        }
    }

    pub fn record_tool(&mut self, name: &str, success: bool) {
        self.tools.push(name.to_string());
        if !success {
            self.failed_tools += 1;
        }
    }

    pub fn log_summary(&self) {
        let tools_str = if self.tools.is_empty() {
            "0".to_string()
        } else {
            format!("{} ({})", self.tools.len(), self.tools.join(", "))
        };

        if self.outcome == "budget_exhausted" {
            warn!(
                target: "flight_recorder",
                "{}", format!("[LOOP] Turn budget exhausted after {} model calls", self.model_calls).bold().red()
            );
        }
        if self.failed_tools > 0 {
            warn!(
                target: "flight_recorder",
                "{}", format!("[TOOLS] {} tool call(s) failed", self.failed_tools).yellow()
            );
        }

        info!(
            target: "flight_recorder",
            "[CHAT END] Outcome: {} | Model calls: {}/{} | Tools: {}",
            self.outcome, self.model_calls, self.max_turns, tools_str
        );
    }
}
