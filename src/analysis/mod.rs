//! Remote vision analysis: public API.
//!
//! The core only needs "image + question in, answer text out". Transport,
//! quota and auth failures come back as [`AnalysisError`] and are shown to
//! the user as-is; nothing here retries.

mod gemini;

pub use gemini::{GeminiAnalyzer, DEFAULT_MODEL, GEMINI_API_BASE};

use std::future::Future;

/// A vision-capable question answering service.
pub trait Analyzer: Send + Sync + 'static {
    /// Builds an analyzer for `api_key`. Fails on an empty key.
    fn connect(api_key: &str) -> Result<Self, AnalysisError>
    where
        Self: Sized;

    /// Human-readable name shown in the status line.
    fn describe(&self) -> String;

    /// Asks `question` about a base64 PNG.
    fn analyze(
        &self,
        image_base64: &str,
        question: &str,
    ) -> impl Future<Output = Result<String, AnalysisError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("API key not found. Get one free at: https://aistudio.google.com/apikey")]
    MissingApiKey,

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Could not read API response: {0}")]
    MalformedResponse(String),

    #[error("The model returned no answer")]
    EmptyResponse,
}
