#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Civic issue triage backed by an LLM provider.
//!
//! Supports Google Gemini, Anthropic Claude, `OpenAI`, and any
//! `OpenAI`-compatible local/self-hosted server (Ollama, vLLM, llama.cpp,
//! LM Studio) via the `AI_BASE_URL` environment variable. The
//! [`triage::TriageClassifier`] asks the provider for a category, priority
//! and department, and falls back to a keyword scan whenever the provider is
//! missing, fails, or times out.

pub mod providers;
pub mod triage;

pub use triage::TriageClassifier;

use thiserror::Error;

/// Errors that can occur during AI operations.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to LLM provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },

    /// The provider did not answer in time.
    #[error("Provider timed out after {seconds}s")]
    Timeout {
        /// The configured limit.
        seconds: u64,
    },
}
