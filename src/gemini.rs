use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::models::{CaptionSet, ContentBrief, GenerationJob, GenerationResult, ImageData};
use crate::prompts;

/// Shown in place of image feedback when the feedback call fails.
pub const FEEDBACK_FALLBACK: &str = "Could not generate AI feedback at this time.";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("error making API request: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("error unmarshalling response: {0}")]
    Envelope(serde_json::Error),
    #[error("prompt was blocked: {0}")]
    Blocked(String),
    #[error("no content found in API response")]
    NoContent,
    #[error("error parsing caption JSON: {0}")]
    MalformedCaptions(serde_json::Error),
}

// --- Wire types ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub system_instruction: SystemInstruction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
    Other(serde_json::Value),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InlineData {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub data: String,
}

impl InlineData {
    pub fn from_image(image: &ImageData) -> Self {
        Self {
            mime_type: image.media_type.clone(),
            data: image.to_base64(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemInstruction {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: &'static str,
    pub response_schema: &'static serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateResponse {
    fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
            .filter(|r| !r.is_empty())
    }

    /// Text of the first part of the first candidate.
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .and_then(Part::as_text)
    }
}

fn is_base64(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
}

// Replaces long base64 payloads so request bodies stay readable in logs
fn truncate_base64_in_json(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                match val {
                    serde_json::Value::String(s) if key == "data" && s.len() > 100 && is_base64(s) => {
                        *val = serde_json::Value::String(format!(
                            "{}...[truncated {} chars]",
                            &s[..50],
                            s.len() - 50
                        ));
                    }
                    _ => truncate_base64_in_json(val),
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for val in arr.iter_mut() {
                truncate_base64_in_json(val);
            }
        }
        _ => {}
    }
}

// --- Client ---

/// Produces captions, hashtags and feedback for a finished brief.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_content(&self, job: &GenerationJob) -> Result<GenerationResult, GeminiError>;
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: &str, model: String) -> Result<Self, GeminiError> {
        Self::with_timeout(api_key, base_url, model, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        api_key: String,
        base_url: &str,
        model: String,
        timeout: Duration,
    ) -> Result<Self, GeminiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    /// Issues one call and returns the text of the first candidate part.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<String, GeminiError> {
        let url = self.endpoint();
        info!("🔗 Making request to: {}", url.replace(&self.api_key, "***"));

        if tracing::enabled!(tracing::Level::DEBUG) {
            if let Ok(mut body) = serde_json::to_value(request) {
                truncate_base64_in_json(&mut body);
                debug!("📤 Request body: {}", body);
            }
        }

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();
        info!("📥 Response status: {}", status);

        let body = response.text().await?;
        if !status.is_success() {
            error!("❌ API Error response: {}", body);
            return Err(GeminiError::Status { status, body });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(GeminiError::Envelope)?;

        if let Some(reason) = parsed.block_reason() {
            warn!("⛔ Prompt was blocked: {}", reason);
            return Err(GeminiError::Blocked(reason.to_string()));
        }

        parsed
            .first_text()
            .map(str::to_string)
            .ok_or(GeminiError::NoContent)
    }

    /// Structured call. Any failure here aborts the whole generation.
    pub async fn generate_captions(
        &self,
        brief: &ContentBrief,
        image: &InlineData,
    ) -> Result<CaptionSet, GeminiError> {
        let raw = self.generate(&prompts::caption_request(brief, image)).await?;
        serde_json::from_str(&raw).map_err(|e| {
            error!("Failed to unmarshal caption JSON: {}", raw);
            GeminiError::MalformedCaptions(e)
        })
    }

    /// Free-text feedback call.
    pub async fn generate_feedback(&self, image: &InlineData) -> Result<String, GeminiError> {
        let text = self.generate(&prompts::feedback_request(image)).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(GeminiError::NoContent);
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate_content(&self, job: &GenerationJob) -> Result<GenerationResult, GeminiError> {
        let image = InlineData::from_image(&job.image);

        info!("✍️ Generating captions and hashtags...");
        let captions = self.generate_captions(&job.brief, &image).await?;

        info!("💡 Generating AI feedback...");
        let feedback = self.generate_feedback(&image).await.unwrap_or_else(|e| {
            warn!("Could not generate AI feedback: {}", e);
            FEEDBACK_FALLBACK.to_string()
        });

        Ok(GenerationResult::new(captions, feedback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GenerationTicket;
    use axum::{extract::State, http::Uri, Json, Router};
    use bytes::Bytes;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Arc;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

    /// Local stand-in for the provider: replays queued replies and records requests.
    #[derive(Clone, Default)]
    struct MockProvider {
        replies: Arc<Mutex<VecDeque<(StatusCode, String)>>>,
        seen: Arc<Mutex<Vec<(String, Value)>>>,
    }

    impl MockProvider {
        fn requests(&self) -> Vec<(String, Value)> {
            self.seen.lock().clone()
        }
    }

    async fn reply(
        State(mock): State<MockProvider>,
        uri: Uri,
        Json(body): Json<Value>,
    ) -> (StatusCode, String) {
        mock.seen.lock().push((uri.to_string(), body));
        mock.replies
            .lock()
            .pop_front()
            .unwrap_or((StatusCode::INTERNAL_SERVER_ERROR, "no reply queued".into()))
    }

    async fn start(replies: Vec<(StatusCode, String)>) -> (GeminiClient, MockProvider) {
        let mock = MockProvider::default();
        mock.replies.lock().extend(replies);
        let app = Router::new().fallback(reply).with_state(mock.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let client =
            GeminiClient::new("test-key".into(), &format!("http://{addr}/"), "test-model".into())
                .unwrap();
        (client, mock)
    }

    fn text_reply(text: &str) -> (StatusCode, String) {
        let body = json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        });
        (StatusCode::OK, body.to_string())
    }

    fn captions_reply() -> (StatusCode, String) {
        let hashtags: Vec<String> = (1..=15).map(|i| format!("#Tag{i}")).collect();
        let payload = json!({
            "caption1": "Winter knits, made in Bangladesh.",
            "caption2": "AR Sourcing Bangladesh brings luxury to your line.",
            "caption3": "arsourcingbd: premium fabric, private label.",
            "hashtags": hashtags,
        });
        text_reply(&payload.to_string())
    }

    fn job() -> GenerationJob {
        GenerationJob {
            ticket: GenerationTicket::next(),
            image: ImageData::detect(Bytes::from_static(PNG)).unwrap(),
            brief: ContentBrief {
                platform: "Instagram".into(),
                tone: "Luxury".into(),
                services: vec!["OEM".into(), "Fabric".into()],
                context: "New winter line".into(),
            },
        }
    }

    fn inline() -> InlineData {
        InlineData::from_image(&job().image)
    }

    #[tokio::test]
    async fn test_generate_returns_first_text_part() {
        let (client, mock) = start(vec![text_reply("Great angle.")]).await;
        let text = client
            .generate(&prompts::feedback_request(&inline()))
            .await
            .unwrap();
        assert_eq!(text, "Great angle.");

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].0,
            "/models/test-model:generateContent?key=test-key"
        );
    }

    #[tokio::test]
    async fn test_non_success_status_carries_body() {
        let (client, _mock) =
            start(vec![(StatusCode::BAD_REQUEST, "{\"error\":\"bad key\"}".into())]).await;
        let err = client
            .generate(&prompts::feedback_request(&inline()))
            .await
            .unwrap_err();
        match err {
            GeminiError::Status { status, body } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert!(body.contains("bad key"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_block_reason_surfaced_verbatim() {
        let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } }).to_string();
        let (client, _mock) = start(vec![(StatusCode::OK, body)]).await;
        let err = client
            .generate(&prompts::feedback_request(&inline()))
            .await
            .unwrap_err();
        assert!(matches!(&err, GeminiError::Blocked(r) if r == "SAFETY"));
        assert_eq!(err.to_string(), "prompt was blocked: SAFETY");
    }

    #[tokio::test]
    async fn test_missing_candidates_is_no_content() {
        let body = json!({ "candidates": [] }).to_string();
        let (client, _mock) = start(vec![(StatusCode::OK, body)]).await;
        let err = client
            .generate(&prompts::feedback_request(&inline()))
            .await
            .unwrap_err();
        assert!(matches!(err, GeminiError::NoContent));
    }

    #[tokio::test]
    async fn test_full_generation_issues_structured_then_feedback_call() {
        let (client, mock) =
            start(vec![captions_reply(), text_reply("  Use softer lighting.  ")]).await;
        let result = client.generate_content(&job()).await.unwrap();

        assert_eq!(result.captions[1], "AR Sourcing Bangladesh brings luxury to your line.");
        assert_eq!(result.hashtags.len(), 15);
        assert_eq!(result.feedback, "Use softer lighting.");

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        let structured = &requests[0].1;
        let feedback = &requests[1].1;
        assert_eq!(
            structured["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            structured["generationConfig"]["responseSchema"]["required"],
            json!(["caption1", "caption2", "caption3", "hashtags"])
        );
        assert!(feedback.get("generationConfig").is_none());
        assert_eq!(
            structured["contents"][0]["parts"][1]["inlineData"],
            feedback["contents"][0]["parts"][1]["inlineData"]
        );
        assert_eq!(
            structured["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "image/png"
        );
    }

    #[tokio::test]
    async fn test_structured_failure_skips_feedback_call() {
        let (client, mock) = start(vec![
            (StatusCode::SERVICE_UNAVAILABLE, "overloaded".into()),
            text_reply("never requested"),
        ])
        .await;
        let err = client.generate_content(&job()).await.unwrap_err();
        assert!(matches!(err, GeminiError::Status { .. }));
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_captions_abort_generation() {
        let (client, mock) = start(vec![text_reply("here are your captions!")]).await;
        let err = client.generate_content(&job()).await.unwrap_err();
        assert!(matches!(err, GeminiError::MalformedCaptions(_)));
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_feedback_failure_falls_back() {
        let (client, _mock) = start(vec![
            captions_reply(),
            (StatusCode::INTERNAL_SERVER_ERROR, "boom".into()),
        ])
        .await;
        let result = client.generate_content(&job()).await.unwrap();
        assert_eq!(result.captions.len(), 3);
        assert_eq!(result.feedback, FEEDBACK_FALLBACK);
    }

    #[tokio::test]
    async fn test_slow_provider_times_out_as_transport_error() {
        let app = Router::new().fallback(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            (StatusCode::OK, "{}")
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let client = GeminiClient::with_timeout(
            "test-key".into(),
            &format!("http://{addr}"),
            "test-model".into(),
            Duration::from_millis(100),
        )
        .unwrap();

        let err = client.generate_content(&job()).await.unwrap_err();
        assert!(matches!(&err, GeminiError::Http(e) if e.is_timeout()), "{err:?}");
    }

    #[test]
    fn test_truncate_leaves_non_base64_data_alone() {
        let text = "é".repeat(120);
        let mut value = json!({ "data": text.clone() });
        truncate_base64_in_json(&mut value);
        assert_eq!(value["data"], text.as_str());
    }

    #[test]
    fn test_truncate_base64_in_json() {
        let long = "A".repeat(400);
        let mut value = json!({ "contents": [{ "parts": [{ "inlineData": { "data": long, "mimeType": "image/png" } }] }] });
        truncate_base64_in_json(&mut value);
        let data = value["contents"][0]["parts"][0]["inlineData"]["data"]
            .as_str()
            .unwrap();
        assert!(data.ends_with("[truncated 350 chars]"));
        assert_eq!(
            value["contents"][0]["parts"][0]["inlineData"]["mimeType"],
            "image/png"
        );
    }
}
