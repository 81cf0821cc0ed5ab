//! Text-generation backend: the [`TextModel`] seam and a Gemini client behind it.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::constants::{DEFAULT_GEMINI_MODEL, GEMINI_API_BASE};
use crate::error::MemeError;

/// Anything that turns a prompt into a blob of text.
pub trait TextModel {
    /// Send `prompt` once and return the raw text the model produced.
    fn generate_text(&self, prompt: &str) -> impl Future<Output = Result<String, MemeError>> + Send;
}

// -----------------------------
// generateContent wire types
// -----------------------------

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Google Gemini `generateContent` client.
#[derive(Clone, Debug)]
pub struct GeminiModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiModel {
    /// Client for the default model against the public API.
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: GEMINI_API_BASE.to_string(),
        }
    }

    /// Use a different model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at a different API host, eg a proxy or a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The model name requests are sent to.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

impl TextModel for GeminiModel {
    async fn generate_text(&self, prompt: &str) -> Result<String, MemeError> {
        let req_body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&req_body)
            .send()
            .await
            .map_err(|err| MemeError::ModelInvocation(format!("request failed: {err}")))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|err| MemeError::ModelInvocation(format!("failed reading body: {err}")))?;

        if !status.is_success() {
            return Err(MemeError::ModelInvocation(format!(
                "Gemini API error {status}: {}",
                String::from_utf8_lossy(&bytes)
            )));
        }

        let parsed: GenerateContentResponse = serde_json::from_slice(&bytes).map_err(|err| {
            MemeError::ModelInvocation(format!("failed to parse generateContent JSON: {err}"))
        })?;
        if let Some(err) = parsed.error {
            return Err(MemeError::ModelInvocation(format!(
                "Gemini API returned error: {err}"
            )));
        }

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                MemeError::ModelInvocation("generateContent returned no candidate text".to_string())
            })?;

        debug!("Gemini ({}) returned {} bytes of text", self.model, text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn model_for(server: &MockServer) -> GeminiModel {
        GeminiModel::new(reqwest::Client::new(), "test-key").with_base_url(server.base_url())
    }

    #[tokio::test]
    async fn returns_candidate_text() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemini-2.5-flash-lite:generateContent")
                    .header("x-goog-api-key", "test-key")
                    .body_contains("Monday mornings");
                then.status(200).json_body(json!({
                    "candidates": [{
                        "content": {"role": "model", "parts": [{"text": "{\"templateIndex\": "}, {"text": "0}"}]}
                    }]
                }));
            })
            .await;

        let text = model_for(&server)
            .generate_text("a meme about Monday mornings")
            .await
            .expect("generate text");

        mock.assert_async().await;
        assert_eq!(text, "{\"templateIndex\": 0}");
    }

    #[tokio::test]
    async fn http_errors_are_model_invocation_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(403).body("API key not valid");
            })
            .await;

        let err = model_for(&server)
            .generate_text("anything")
            .await
            .expect_err("403 should fail");
        assert!(matches!(err, MemeError::ModelInvocation(_)));
        assert!(err.to_string().contains("API key not valid"));
    }

    #[tokio::test]
    async fn empty_candidates_are_model_invocation_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({"candidates": []}));
            })
            .await;

        let err = model_for(&server)
            .generate_text("anything")
            .await
            .expect_err("no candidates should fail");
        assert!(matches!(err, MemeError::ModelInvocation(_)));
    }

    #[tokio::test]
    async fn unreachable_backend_is_model_invocation_error() {
        let model = GeminiModel::new(reqwest::Client::new(), "k")
            .with_base_url("http://127.0.0.1:9")
            .with_model("other-model");
        assert_eq!(model.model(), "other-model");
        let err = model.generate_text("anything").await.expect_err("no server");
        assert!(matches!(err, MemeError::ModelInvocation(_)));
    }
}
