use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors from the embedding provider. Always non-fatal: callers log and
/// let the vector signal degrade to zero.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Client for the external embedding provider.
///
/// The provider is an opaque collaborator: it takes a text and returns a
/// fixed-length numeric vector. It may be unconfigured or unavailable at
/// any time; matching continues without the vector signal.
pub struct EmbeddingClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl EmbeddingClient {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            api_key,
            client,
        }
    }

    /// Fetch the embedding vector for a text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));

        let mut request = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "input": text }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(EmbeddingError::ApiError(format!(
                "Embedding request failed: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;

        let values = json
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| EmbeddingError::InvalidResponse("Missing embedding array".into()))?;

        let vector: Vec<f32> = values
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect();

        if vector.len() != values.len() {
            return Err(EmbeddingError::InvalidResponse(
                "Embedding array contained non-numeric values".into(),
            ));
        }

        Ok(vector)
    }
}
