/// Model calls allowed per `process_chat` before giving up.
pub const DEFAULT_MAX_TURNS: u32 = 10;

pub const LOOP_FALLBACK_MESSAGE: &str =
    "Sorry, I got stuck in a reasoning loop. Could you rephrase?";

pub const DEFAULT_PERSONA: &str = "You are a helpful AI assistant.";

/// First user turn of every freshly seeded session.
pub const PERSONA_INIT_PROMPT: &str = "Initialize with your persona.";

/// Number of turns a new session starts with (init prompt + greeting).
pub const SEED_TURNS: usize = 2;

pub const PERSONA_UPDATED_MESSAGE: &str = "System: Persona has been updated for this session.";
pub const UPDATE_PERSONA_TOOL: &str = "update_persona";

/// Retry defaults for model calls
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

/// Gemini REST endpoint and generation settings
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL_NAME: &str = "gemini-1.5-flash";
pub const GEMINI_MAX_OUTPUT_TOKENS: u32 = 8192;
pub const GEMINI_TEMPERATURE: f32 = 0.7;
pub const GEMINI_TOP_P: f32 = 0.9;
pub const GEMINI_TOP_K: u32 = 40;

/// Ingress limits
pub const MAX_PROMPT_CHARS: usize = 10_000;

/// Tool limits
pub const MAX_READ_FILE_BYTES: u64 = 10 * 1024 * 1024;
pub const CLIPBOARD_MAX_ITEMS: usize = 50;
pub const CLIPBOARD_MAX_CHARS: usize = 500;
pub const NOTEPAD_EMPTY_MESSAGE: &str = "The notepad is currently empty.";

/// Characters the calculator accepts.
pub const CALCULATOR_ALLOWED: &str = "0123456789+-*/(). \t\n\r";
pub const CALCULATOR_MAX_DEPTH: usize = 256;

/// Session store bounds
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 3600;

/// MCP protocol
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
pub const JSONRPC_METHOD_NOT_FOUND: i64 = -32601;
pub const JSONRPC_INVALID_PARAMS: i64 = -32602;
pub const JSONRPC_INVALID_REQUEST: i64 = -32600;
