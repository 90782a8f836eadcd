//! Gemini streaming backend.
//!
//! Calls `models/<model>:streamGenerateContent?alt=sse` and yields the text
//! parts of each server-sent event as fragments.

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::{ChatBackend, FragmentStream, TurnRequest};
use crate::error::ChatError;
use crate::types::Role;

/// Streaming client for the Gemini generative language API.
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl GeminiBackend {
    pub fn new(api_key: SecretString, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, model
        )
    }
}

impl ChatBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn stream_turn(&self, request: TurnRequest) -> FragmentStream {
        let client = self.client.clone();
        let url = self.url(&request.model);
        let api_key = self.api_key.expose_secret().to_string();
        let body = GenerateContentRequest::from_turn(&request);

        Box::pin(async_stream::try_stream! {
            debug!(model = %request.model, history = request.history.len(), "Opening Gemini stream");
            let response = client
                .post(&url)
                .header("x-goog-api-key", api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| ChatError::Transport(format!("HTTP request failed: {e}")))?;

            let status = response.status();
            let response = if status.is_success() {
                response
            } else {
                let error_body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %error_body, "Gemini API error response");
                Err::<reqwest::Response, _>(status_error(status, &error_body))?
            };

            let mut events = response.bytes_stream().eventsource();
            while let Some(event) = events.next().await {
                let event = event.map_err(|e| ChatError::Transport(format!("stream read failed: {e}")))?;
                if let Some(text) = decode_chunk(&event.data)? {
                    yield text;
                }
            }
        })
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
}

impl GenerateContentRequest {
    fn from_turn(request: &TurnRequest) -> Self {
        let mut contents: Vec<Content> = request
            .history
            .iter()
            .map(|turn| Content::text(wire_role(turn.role), &turn.text))
            .collect();
        contents.push(Content::text(Some("user"), &request.message));
        Self {
            system_instruction: Content::text(None, &request.system_instruction),
            contents,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

fn wire_role(role: Role) -> Option<&'static str> {
    match role {
        Role::User => Some("user"),
        Role::Model => Some("model"),
    }
}

/// Text carried by one SSE `data:` payload. Chunks without text (usage or
/// safety metadata) yield `None`.
fn decode_chunk(data: &str) -> Result<Option<String>, ChatError> {
    let chunk: GenerateContentChunk = serde_json::from_str(data)
        .map_err(|e| ChatError::Deserialization(format!("Gemini chunk: {e}")))?;
    if let Some(error) = chunk.error {
        return Err(ChatError::Transport(error.message));
    }
    let text: String = chunk
        .candidates
        .into_iter()
        .take(1)
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.text)
        .collect();
    Ok(if text.is_empty() { None } else { Some(text) })
}

/// Map a non-2xx response to a transport error.
fn status_error(status: reqwest::StatusCode, body: &str) -> ChatError {
    ChatError::Transport(format!("HTTP {status}: {}", api_error_message(body)))
}

/// Pull the human-readable message out of an error body, falling back to
/// the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConversationTurn;

    #[test]
    fn test_url_includes_model_and_sse() {
        let backend = GeminiBackend::new(
            SecretString::from("test-key-not-real"),
            "https://generativelanguage.googleapis.com/",
        );
        assert_eq!(
            backend.url("gemini-2.5-flash-preview-04-17"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-preview-04-17:streamGenerateContent?alt=sse"
        );
        assert_eq!(backend.name(), "gemini");
    }

    #[test]
    fn test_request_body_shape() {
        let request = TurnRequest {
            model: "m".into(),
            system_instruction: "be helpful".into(),
            history: vec![
                ConversationTurn {
                    role: Role::User,
                    text: "hi".into(),
                },
                ConversationTurn {
                    role: Role::Model,
                    text: "hello".into(),
                },
            ],
            message: "add Kyoto".into(),
        };
        let json = serde_json::to_value(GenerateContentRequest::from_turn(&request)).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be helpful");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][2]["parts"][0]["text"], "add Kyoto");
        assert_eq!(json["contents"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_decode_text_chunk() {
        let data = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello "},{"text":"there"}]}}]}"#;
        assert_eq!(decode_chunk(data).unwrap().as_deref(), Some("Hello there"));
    }

    #[test]
    fn test_decode_metadata_chunk() {
        let data = r#"{"candidates":[{"finishReason":"STOP"}],"usageMetadata":{"totalTokenCount":12}}"#;
        assert_eq!(decode_chunk(data).unwrap(), None);
    }

    #[test]
    fn test_decode_error_chunk() {
        let data = r#"{"error":{"code":429,"message":"Resource exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(
            decode_chunk(data),
            Err(ChatError::Transport(ref m)) if m == "Resource exhausted"
        ));
    }

    #[test]
    fn test_status_error_uses_api_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        let err = status_error(reqwest::StatusCode::BAD_REQUEST, body);
        assert!(matches!(
            err,
            ChatError::Transport(ref m) if m == "HTTP 400 Bad Request: API key not valid."
        ));
    }

    #[test]
    fn test_status_error_falls_back_to_raw_body() {
        let err = status_error(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(
            err.to_string(),
            "transport error: HTTP 502 Bad Gateway: upstream down"
        );
    }

    #[tokio::test]
    async fn test_non_success_status_ends_stream_with_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = socket.read(&mut buf).await;
            let body = r#"{"error":{"message":"quota exceeded"}}"#;
            let reply = format!(
                "HTTP/1.1 429 Too Many Requests\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
        });

        let backend = GeminiBackend {
            client: reqwest::Client::builder().no_proxy().build().unwrap(),
            api_key: SecretString::from("k"),
            base_url: format!("http://{addr}"),
        };
        let mut stream = backend.stream_turn(TurnRequest {
            model: "m".into(),
            system_instruction: "s".into(),
            history: Vec::new(),
            message: "hi".into(),
        });

        let first = stream.next().await.unwrap();
        assert!(matches!(
            first,
            Err(ChatError::Transport(ref m)) if m == "HTTP 429 Too Many Requests: quota exceeded"
        ));
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode_chunk("not json"),
            Err(ChatError::Deserialization(_))
        ));
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(api_error_message(body), "API key not valid.");
        assert_eq!(api_error_message("Bad Gateway"), "Bad Gateway");
    }
}
