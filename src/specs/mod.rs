pub mod gemini;
pub mod mcp;
