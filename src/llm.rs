use crate::config::Config;
use crate::error::TransportError;
use anyhow::{Context, Result};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::time::Duration;
use uuid::Uuid;

/// Events emitted while a reply streams in
#[derive(Debug)]
pub enum LlmEvent {
    /// Text delta from streaming response
    TextDelta(String),
    /// Stream completed
    StreamComplete,
    /// Error occurred; nothing follows it
    Error(TransportError),
}

/// Fixed configuration a chat session is created with
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub model: String,
    pub system_instruction: String,
    pub temperature: f32,
}

/// Creates chat sessions against a remote model.
///
/// Creation never fails; problems such as a missing credential surface as a
/// [`TransportError`] the first time the session is used.
pub trait ChatClient {
    type Session: ChatSession + 'static;

    fn create_chat(&self, settings: &ChatSettings) -> Self::Session;
}

/// One conversation with the remote model. The session remembers the turns
/// it has completed and sends them along with each new message.
pub trait ChatSession: Send + Sync {
    /// Unique per session, so a replacement can be told apart
    fn id(&self) -> Uuid;

    /// Start sending `message`. Fragments arrive on the returned channel in
    /// order, followed by exactly one `StreamComplete` or `Error`.
    fn send_message_stream(&self, message: &str) -> mpsc::Receiver<LlmEvent>;
}

/// Gemini client for streaming responses
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key(),
        })
    }
}

impl ChatClient for GeminiClient {
    type Session = GeminiChat;

    fn create_chat(&self, settings: &ChatSettings) -> GeminiChat {
        let chat = GeminiChat {
            id: Uuid::new_v4(),
            http: self.http.clone(),
            url: format!(
                "{}/models/{}:streamGenerateContent?alt=sse",
                self.base_url, settings.model
            ),
            api_key: self.api_key.clone(),
            system_instruction: GeminiContent::system(&settings.system_instruction),
            temperature: settings.temperature,
            history: Arc::new(Mutex::new(Vec::new())),
        };
        tracing::debug!(session = %chat.id, model = %settings.model, "created chat session");
        chat
    }
}

/// A Gemini chat. The REST API is stateless, so the turn history lives here.
pub struct GeminiChat {
    id: Uuid,
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
    system_instruction: GeminiContent,
    temperature: f32,
    history: Arc<Mutex<Vec<GeminiContent>>>,
}

impl GeminiChat {
    fn build_request(&self, message: &str) -> GeminiRequest {
        let mut contents = self
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        contents.push(GeminiContent::turn("user", message));

        GeminiRequest {
            contents,
            system_instruction: Some(self.system_instruction.clone()),
            generation_config: GeminiGenerationConfig {
                temperature: self.temperature,
            },
        }
    }

    /// POST the request and forward every text fragment. Returns the full
    /// reply text once the provider closes the stream.
    async fn stream_reply(
        http: reqwest::Client,
        url: String,
        api_key: String,
        request: &GeminiRequest,
        tx: &mpsc::Sender<LlmEvent>,
    ) -> Result<String, TransportError> {
        let response = http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut reply = String::new();

        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);

            // Decode whole lines only; a chunk boundary may split a UTF-8 sequence
            while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=newline_pos).collect();
                if let Some(text) = parse_sse_line(&String::from_utf8_lossy(&line))? {
                    reply.push_str(&text);
                    let _ = tx.send(LlmEvent::TextDelta(text)).await;
                }
            }
        }

        // Flush any remaining buffer line (without newline)
        if let Some(text) = parse_sse_line(&String::from_utf8_lossy(&buffer))? {
            reply.push_str(&text);
            let _ = tx.send(LlmEvent::TextDelta(text)).await;
        }

        Ok(reply)
    }
}

impl ChatSession for GeminiChat {
    fn id(&self) -> Uuid {
        self.id
    }

    fn send_message_stream(&self, message: &str) -> mpsc::Receiver<LlmEvent> {
        let (tx, rx) = mpsc::channel(256);

        let Some(api_key) = self.api_key.clone() else {
            let _ = tx.try_send(LlmEvent::Error(TransportError::MissingApiKey));
            return rx;
        };

        let request = self.build_request(message);
        let http = self.http.clone();
        let url = self.url.clone();
        let history = Arc::clone(&self.history);
        let session = self.id;

        tokio::spawn(async move {
            let started = std::time::Instant::now();
            match Self::stream_reply(http, url, api_key, &request, &tx).await {
                Ok(reply) => {
                    tracing::info!(
                        %session,
                        duration_ms = %started.elapsed().as_millis(),
                        reply_chars = reply.chars().count(),
                        "reply stream completed"
                    );
                    // Gemini rejects empty text parts, so a blocked or empty
                    // reply drops the whole exchange from the history
                    if reply.is_empty() {
                        tracing::warn!(%session, "empty reply not added to history");
                    } else if let Some(user_turn) = request.contents.last().cloned() {
                        let mut history = history.lock().unwrap_or_else(PoisonError::into_inner);
                        history.push(user_turn);
                        history.push(GeminiContent::turn("model", &reply));
                    }
                    let _ = tx.send(LlmEvent::StreamComplete).await;
                }
                Err(error) => {
                    tracing::error!(
                        %session,
                        duration_ms = %started.elapsed().as_millis(),
                        %error,
                        "reply stream failed"
                    );
                    let _ = tx.send(LlmEvent::Error(error)).await;
                }
            }
        });

        rx
    }
}

/// Extract the text carried by one server-sent-event line.
///
/// Non-data lines, `[DONE]` and chunks without text yield `None`.
pub fn parse_sse_line(line: &str) -> Result<Option<String>, TransportError> {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }

    let chunk: GeminiStreamChunk =
        serde_json::from_str(data).map_err(|e| TransportError::Malformed(e.to_string()))?;

    if let Some(error) = chunk.error {
        return Err(TransportError::Remote(error.message));
    }

    let text: String = chunk
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    Ok((!text.is_empty()).then_some(text))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

impl GeminiContent {
    fn turn(role: &str, text: &str) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![GeminiPart {
                text: Some(text.to_string()),
            }],
        }
    }

    fn system(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![GeminiPart {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiStreamChunk {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    error: Option<GeminiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: String,
}


#[cfg(test)]
mod tests {
    use super::*;

    fn offline_config() -> Config {
        Config {
            api_key: Some("key".to_string()),
            base_url: "http://127.0.0.1:9/v1beta/".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn sse_data_line_yields_concatenated_parts() {
        let line = r#"data: {"candidates":[{"content":{"role":"model","parts":[{"text":"Xin"},{"text":" chào"}]}}]}"#;
        assert_eq!(parse_sse_line(line).unwrap().as_deref(), Some("Xin chào"));
    }

    #[test]
    fn sse_lines_without_text_are_skipped() {
        assert_eq!(parse_sse_line("").unwrap(), None);
        assert_eq!(parse_sse_line(": keep-alive").unwrap(), None);
        assert_eq!(parse_sse_line("event: message").unwrap(), None);
        assert_eq!(parse_sse_line("data: [DONE]").unwrap(), None);
        let finish = r#"data: {"candidates":[{"content":{"parts":[]},"finishReason":"STOP"}]}"#;
        assert_eq!(parse_sse_line(finish).unwrap(), None);
        let usage_only = r#"data: {"usageMetadata":{"totalTokenCount":12}}"#;
        assert_eq!(parse_sse_line(usage_only).unwrap(), None);
    }

    #[test]
    fn sse_error_payload_is_a_transport_error() {
        let line = r#"data: {"error":{"code":429,"message":"quota exceeded"}}"#;
        match parse_sse_line(line) {
            Err(TransportError::Remote(message)) => assert_eq!(message, "quota exceeded"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn sse_garbage_is_malformed() {
        assert!(matches!(
            parse_sse_line("data: {not json"),
            Err(TransportError::Malformed(_))
        ));
    }

    #[test]
    fn request_carries_instruction_temperature_and_history() {
        let client = GeminiClient::new(&offline_config()).unwrap();
        let chat = client.create_chat(&testing::settings());
        chat.history
            .lock()
            .unwrap()
            .extend([GeminiContent::turn("user", "hi"), GeminiContent::turn("model", "hello")]);

        let body = serde_json::to_value(chat.build_request("điểm chuẩn?")).unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "test instruction");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["generationConfig"]["temperature"], 0.5);
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][0]["text"], "điểm chuẩn?");
    }

    #[test]
    fn sessions_get_distinct_ids_and_stream_url() {
        let client = GeminiClient::new(&offline_config()).unwrap();
        let first = client.create_chat(&testing::settings());
        let second = client.create_chat(&testing::settings());

        assert_ne!(first.id(), second.id());
        assert_eq!(
            first.url,
            "http://127.0.0.1:9/v1beta/models/test-model:streamGenerateContent?alt=sse"
        );
    }

    #[tokio::test]
    async fn missing_api_key_fails_on_first_use() {
        let client = GeminiClient {
            http: reqwest::Client::new(),
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: None,
        };
        let chat = client.create_chat(&testing::settings());

        let mut events = chat.send_message_stream("hello");
        assert!(matches!(
            events.recv().await,
            Some(LlmEvent::Error(TransportError::MissingApiKey))
        ));
        assert!(events.recv().await.is_none());
    }

    /// Serve one canned HTTP response on a local port. Each entry in `writes`
    /// goes out as its own TCP write. Resolves to the raw request received.
    async fn serve_once(
        head: &'static str,
        writes: Vec<Vec<u8>>,
    ) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v1beta", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&received);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .filter_map(|line| line.split_once(':'))
                        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if received.len() >= end + 4 + length {
                        break;
                    }
                }
            }

            socket.write_all(head.as_bytes()).await.unwrap();
            for write in writes {
                socket.write_all(&write).await.unwrap();
                socket.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            socket.shutdown().await.unwrap();

            String::from_utf8_lossy(&received).into_owned()
        });

        (base_url, server)
    }

    const SSE_OK: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n";

    fn text_line(text: &str) -> Vec<u8> {
        format!(
            "data: {}\n\n",
            serde_json::json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]})
        )
        .into_bytes()
    }

    fn chat_against(base_url: String) -> GeminiChat {
        let config = Config {
            api_key: Some("test-key".to_string()),
            base_url,
            ..Config::default()
        };
        GeminiClient::new(&config)
            .unwrap()
            .create_chat(&testing::settings())
    }

    async fn collect(mut events: mpsc::Receiver<LlmEvent>) -> Vec<LlmEvent> {
        let mut collected = Vec::new();
        while let Some(event) = events.recv().await {
            collected.push(event);
        }
        collected
    }

    fn texts(events: &[LlmEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|event| match event {
                LlmEvent::TextDelta(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn history_of(chat: &GeminiChat) -> Vec<(Option<String>, String)> {
        chat.history
            .lock()
            .unwrap()
            .iter()
            .map(|turn| {
                let text = turn.parts.iter().filter_map(|p| p.text.clone()).collect();
                (turn.role.clone(), text)
            })
            .collect()
    }

    #[tokio::test]
    async fn completed_stream_commits_one_exchange() {
        let (base_url, server) =
            serve_once(SSE_OK, vec![text_line("Xin"), text_line(" chào")]).await;
        let chat = chat_against(base_url);

        let events = collect(chat.send_message_stream("Học phí?")).await;

        assert_eq!(texts(&events), ["Xin", " chào"]);
        assert!(matches!(events.last(), Some(LlmEvent::StreamComplete)));
        assert_eq!(
            history_of(&chat),
            [
                (Some("user".to_string()), "Học phí?".to_string()),
                (Some("model".to_string()), "Xin chào".to_string()),
            ]
        );

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1beta/models/test-model:streamGenerateContent?alt=sse"));
        assert!(request.to_lowercase().contains("x-goog-api-key: test-key"));
    }

    #[tokio::test]
    async fn error_status_keeps_body_and_commits_nothing() {
        let (base_url, _server) = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 4\r\nConnection: close\r\n\r\nboom",
            Vec::new(),
        )
        .await;
        let chat = chat_against(base_url);

        let events = collect(chat.send_message_stream("hi")).await;

        match events.as_slice() {
            [LlmEvent::Error(TransportError::Status { status, body })] => {
                assert_eq!(*status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected events: {other:?}"),
        }
        assert!(history_of(&chat).is_empty());
    }

    #[tokio::test]
    async fn error_chunk_mid_stream_commits_nothing() {
        let (base_url, _server) = serve_once(
            SSE_OK,
            vec![
                text_line("Xin"),
                b"data: {\"error\":{\"code\":503,\"message\":\"overloaded\"}}\n\n".to_vec(),
            ],
        )
        .await;
        let chat = chat_against(base_url);

        let events = collect(chat.send_message_stream("hi")).await;

        assert_eq!(texts(&events), ["Xin"]);
        match events.last() {
            Some(LlmEvent::Error(TransportError::Remote(message))) => {
                assert_eq!(message, "overloaded")
            }
            other => panic!("unexpected last event: {other:?}"),
        }
        assert!(history_of(&chat).is_empty());
    }

    #[tokio::test]
    async fn multibyte_text_split_across_writes_arrives_intact() {
        let line = text_line("ch\u{e0}o");
        let a_grave = "\u{e0}".as_bytes();
        let split = line
            .windows(a_grave.len())
            .position(|pair| pair == a_grave)
            .unwrap()
            + 1;
        let (base_url, _server) =
            serve_once(SSE_OK, vec![line[..split].to_vec(), line[split..].to_vec()]).await;
        let chat = chat_against(base_url);

        let events = collect(chat.send_message_stream("hi")).await;

        assert_eq!(texts(&events), ["ch\u{e0}o"]);
        assert!(matches!(events.last(), Some(LlmEvent::StreamComplete)));
    }

    #[tokio::test]
    async fn last_line_without_newline_is_flushed() {
        let mut line = text_line("cuối");
        line.truncate(line.len() - 2);
        let (base_url, _server) = serve_once(SSE_OK, vec![line]).await;
        let chat = chat_against(base_url);

        let events = collect(chat.send_message_stream("hi")).await;

        assert_eq!(texts(&events), ["cuối"]);
        assert_eq!(history_of(&chat).len(), 2);
    }

    #[tokio::test]
    async fn empty_reply_is_left_out_of_history() {
        let (base_url, _server) = serve_once(
            SSE_OK,
            vec![b"data: {\"candidates\":[{\"finishReason\":\"SAFETY\"}]}\n\n".to_vec()],
        )
        .await;
        let chat = chat_against(base_url);

        let events = collect(chat.send_message_stream("hi")).await;

        assert!(matches!(events.as_slice(), [LlmEvent::StreamComplete]));
        assert!(history_of(&chat).is_empty());
        let next = serde_json::to_value(chat.build_request("next")).unwrap();
        assert_eq!(next["contents"].as_array().unwrap().len(), 1);
    }
}
