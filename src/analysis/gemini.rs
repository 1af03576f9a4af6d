//! Google Gemini `generateContent` client.
//!
//! One non-streaming request per question: the question as a text part
//! followed by the capture as an inline PNG part.

use super::{AnalysisError, Analyzer};
use serde::Deserialize;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

#[derive(Debug, Clone)]
pub struct GeminiAnalyzer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiAnalyzer {
    pub fn new(api_key: &str, model: &str) -> Result<Self, AnalysisError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(AnalysisError::MissingApiKey);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    /// Points the client at another host (proxies, tests).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

/// JSON body for one question about one image.
pub(crate) fn request_body(image_base64: &str, question: &str) -> serde_json::Value {
    serde_json::json!({
        "contents": [
            {
                "parts": [
                    { "text": question },
                    {
                        "inline_data": {
                            "mime_type": "image/png",
                            "data": image_base64,
                        }
                    }
                ]
            }
        ]
    })
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Joins the text parts of the first candidate.
pub(crate) fn extract_answer(body: &str) -> Result<String, AnalysisError> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }
    Ok(text)
}

impl Analyzer for GeminiAnalyzer {
    fn connect(api_key: &str) -> Result<Self, AnalysisError> {
        let model = std::env::var("GEMINI_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Self::new(api_key, &model)
    }

    fn describe(&self) -> String {
        format!("Gemini ({})", self.model)
    }

    async fn analyze(&self, image_base64: &str, question: &str) -> Result<String, AnalysisError> {
        log::info!("[ANALYZE] Model: {}", self.model);
        let start = std::time::Instant::now();

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request_body(image_base64, question))
            .send()
            .await
            .map_err(|e| {
                log::error!("[ANALYZE] HTTP request failed: {}", e);
                AnalysisError::Transport(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;

        if !status.is_success() {
            log::error!("[ANALYZE] API returned {}: {}", status, body);
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let answer = extract_answer(&body)?;
        log::info!(
            "[ANALYZE] Answer ({} chars) in {}ms",
            answer.len(),
            start.elapsed().as_millis()
        );
        Ok(answer)
    }
}
