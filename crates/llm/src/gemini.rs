//! Gemini Provider
//!
//! Implementation of the ModelBackend trait for the Gemini REST API.
//! Structured requests use `generateContent` with a JSON response schema;
//! file content is streamed from `streamGenerateContent` over SSE.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::provider::{missing_api_key_error, parse_http_error, ModelBackend};
use super::schema::ResponseSchema;
use super::types::{LlmError, LlmResult, ProviderConfig};
use crate::http_client::build_http_client;
use crate::streaming_adapters::GeminiAdapter;
use repo_weaver_core::streaming::{StreamAdapter, UnifiedStreamEvent};

/// Default Gemini API base URL
pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROVIDER: &str = "gemini";

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Gemini provider
pub struct GeminiProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider with the given configuration
    pub fn new(config: ProviderConfig) -> LlmResult<Self> {
        let client = build_http_client(config.request_timeout_secs)?;
        Ok(Self { config, client })
    }

    /// Get the API base URL
    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(GEMINI_API_URL)
            .trim_end_matches('/')
    }

    fn api_key(&self) -> LlmResult<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| missing_api_key_error(PROVIDER))
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url(), model, method)
    }

    /// Build the request body for a structured (JSON) request
    fn build_structured_body(&self, prompt: &str, schema: &ResponseSchema) -> serde_json::Value {
        serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.config.plan_temperature,
                "responseMimeType": "application/json",
                "responseSchema": schema,
            }
        })
    }

    /// Build the request body for a streamed text request
    fn build_stream_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.config.stream_temperature,
                "topP": self.config.top_p,
                "topK": self.config.top_k,
            }
        })
    }
}

/// Splits raw SSE bytes into lines.
///
/// Lines are decoded only once complete, so a multi-byte character split
/// across network chunks arrives intact.
#[derive(Debug, Default)]
struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    /// Append a chunk and return every line it completed.
    fn push(&mut self, chunk: &[u8]) -> LlmResult<Vec<String>> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            lines.push(decode_line(&line[..end])?);
        }
        Ok(lines)
    }

    /// Whatever is left once the stream ends, if it is not blank.
    fn finish(self) -> LlmResult<Option<String>> {
        let rest = decode_line(&self.pending)?;
        Ok(if rest.trim().is_empty() { None } else { Some(rest) })
    }
}

fn decode_line(bytes: &[u8]) -> LlmResult<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| LlmError::ParseError {
        message: format!("Stream line is not valid UTF-8: {}", e),
    })
}

#[async_trait]
impl ModelBackend for GeminiProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn generate_structured(
        &self,
        model: &str,
        prompt: &str,
        schema: &ResponseSchema,
    ) -> LlmResult<serde_json::Value> {
        let api_key = self.api_key()?;
        let body = self.build_structured_body(prompt, schema);

        debug!(model, prompt_chars = prompt.len(), "Requesting structured response");

        let response = self
            .client
            .post(self.endpoint(model, "generateContent"))
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        if status != 200 {
            return Err(parse_http_error(status, &body_text, PROVIDER));
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        let text = parsed.text();
        let text = text.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        serde_json::from_str(text).map_err(|e| LlmError::ParseError {
            message: format!("Model returned invalid JSON: {}", e),
        })
    }

    async fn stream_text(
        &self,
        model: &str,
        prompt: &str,
        tx: mpsc::Sender<UnifiedStreamEvent>,
    ) -> LlmResult<()> {
        let api_key = self.api_key()?;
        let body = self.build_stream_body(prompt);

        debug!(model, prompt_chars = prompt.len(), "Starting content stream");

        let response = self
            .client
            .post(format!(
                "{}?alt=sse",
                self.endpoint(model, "streamGenerateContent")
            ))
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;
            return Err(parse_http_error(status, &body_text, PROVIDER));
        }

        let mut adapter = GeminiAdapter::new();
        let mut stream = response.bytes_stream();
        let mut lines = SseLineBuffer::default();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

            for line in lines.push(&chunk)? {
                if line.trim().is_empty() {
                    continue;
                }

                let events = adapter.adapt(&line).map_err(|e| LlmError::ParseError {
                    message: e.to_string(),
                })?;
                for event in events {
                    if let UnifiedStreamEvent::Error { message, code } = &event {
                        warn!(model, ?code, "Error reported inside stream: {}", message);
                        return Err(LlmError::ServerError {
                            message: message.clone(),
                            status: None,
                        });
                    }
                    if tx.send(event).await.is_err() {
                        // Receiver dropped; nobody is listening any more.
                        return Ok(());
                    }
                }
            }
        }

        // Trailing line without a newline terminator
        if let Some(rest) = lines.finish()? {
            let events = adapter.adapt(&rest).map_err(|e| LlmError::ParseError {
                message: e.to_string(),
            })?;
            for event in events {
                if let UnifiedStreamEvent::Error { message, .. } = &event {
                    return Err(LlmError::ServerError {
                        message: message.clone(),
                        status: None,
                    });
                }
                let _ = tx.send(event).await;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ResponseSchema;

    fn test_config() -> ProviderConfig {
        ProviderConfig::default().with_api_key("test-key")
    }

    #[test]
    fn test_provider_creation() {
        let provider = GeminiProvider::new(test_config()).unwrap();
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.base_url(), GEMINI_API_URL);
    }

    #[test]
    fn test_endpoint_uses_base_url_override() {
        let mut config = test_config();
        config.base_url = Some("http://localhost:9999/v1beta/".to_string());
        let provider = GeminiProvider::new(config).unwrap();
        assert_eq!(
            provider.endpoint("gemini-2.5-pro", "generateContent"),
            "http://localhost:9999/v1beta/models/gemini-2.5-pro:generateContent"
        );
    }

    #[test]
    fn test_structured_body() {
        let provider = GeminiProvider::new(test_config()).unwrap();
        let schema = ResponseSchema::object().property("path", ResponseSchema::string());
        let body = provider.build_structured_body("plan it", &schema);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "plan it");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
        assert_eq!(body["generationConfig"]["temperature"], 0.0);
    }

    #[test]
    fn test_stream_body_sampling() {
        let provider = GeminiProvider::new(test_config()).unwrap();
        let body = provider.build_stream_body("write it");
        assert_eq!(body["generationConfig"]["topK"], 64);
        assert!(body["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn test_line_buffer_joins_split_character() {
        let line = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"café\"}]}}]}\n";
        let bytes = line.as_bytes();
        // Split between the two bytes of 'é' (0xC3 0xA9).
        let split = line.find('é').unwrap() + 1;

        let mut buffer = SseLineBuffer::default();
        assert!(buffer.push(&bytes[..split]).unwrap().is_empty());
        let lines = buffer.push(&bytes[split..]).unwrap();
        assert_eq!(lines.len(), 1);

        let events = GeminiAdapter::new().adapt(&lines[0]).unwrap();
        assert_eq!(
            events,
            vec![UnifiedStreamEvent::TextDelta {
                content: "café".to_string()
            }]
        );
        assert_eq!(buffer.finish().unwrap(), None);
    }

    #[test]
    fn test_line_buffer_keeps_unterminated_tail() {
        let mut buffer = SseLineBuffer::default();
        let lines = buffer.push("data: a\n\ndata: b".as_bytes()).unwrap();
        assert_eq!(lines, vec!["data: a".to_string(), String::new()]);
        assert_eq!(buffer.finish().unwrap().as_deref(), Some("data: b"));
    }

    #[test]
    fn test_line_buffer_rejects_invalid_utf8() {
        let mut buffer = SseLineBuffer::default();
        let err = buffer.push(b"data: \xff\n").unwrap_err();
        assert!(matches!(err, LlmError::ParseError { .. }));

        let mut buffer = SseLineBuffer::default();
        buffer.push(b"data: caf\xc3").unwrap();
        assert!(buffer.finish().is_err());
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"text":"1}"}]}}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.text(), r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let provider = GeminiProvider::new(ProviderConfig::default()).unwrap();
        let schema = ResponseSchema::string();
        let result = provider
            .generate_structured("gemini-2.5-pro", "x", &schema)
            .await;
        assert!(matches!(result, Err(LlmError::AuthenticationFailed { .. })));

        let (tx, _rx) = mpsc::channel(4);
        let result = provider.stream_text("gemini-2.5-pro", "x", tx).await;
        assert!(matches!(result, Err(LlmError::AuthenticationFailed { .. })));
    }
}
