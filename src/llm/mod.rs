//! Language-model backend: single-turn chat completions against an
//! OpenAI-compatible endpoint (Groq by default).

mod client;
mod types;

pub use client::{CompletionClient, GroqClient, LlmError};
