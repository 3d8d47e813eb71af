//! OllamaBackend -- concrete [`ChatBackend`] for an Ollama-style server.
//!
//! Only the readiness probe and connection establishment carry timeouts.
//! An open chat stream may run for as long as the model keeps generating.

use std::time::Duration;

use tracing::debug;

use colloquy_core::llm::backend::{ByteStream, ChatBackend};
use colloquy_types::config::BackendConfig;
use colloquy_types::error::ConversationError;
use colloquy_types::llm::ChatRequest;

use super::streaming::{body_stream, classify_send_error, classify_status};

pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    probe_timeout: Duration,
}

impl OllamaBackend {
    /// Build a backend from configuration.
    pub fn new(config: &BackendConfig) -> Result<Self, ConversationError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| {
                ConversationError::Transport(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            probe_timeout: config.probe_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl ChatBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn probe(&self) -> Result<(), ConversationError> {
        let url = self.url("/api/tags");
        debug!(url = %url, "probing backend");

        let response = self
            .client
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| {
                ConversationError::BackendUnavailable(format!(
                    "no response from {} ({e}). Is the server running?",
                    self.base_url
                ))
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ConversationError::BackendUnavailable(format!(
                "{url} returned HTTP {status}"
            )))
        }
    }

    async fn open_chat(&self, request: &ChatRequest) -> Result<ByteStream, ConversationError> {
        let url = self.url("/api/chat");
        debug!(
            url = %url,
            model = %request.model,
            messages = request.messages.len(),
            "opening chat stream"
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %error_body, "chat request rejected");
            return Err(classify_status(status, &error_body));
        }

        Ok(body_stream(response))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;
    use tokio_util::sync::CancellationToken;

    use colloquy_core::llm::decoder::StreamDecoder;
    use colloquy_core::llm::retry::RetryPolicy;
    use colloquy_core::llm::transport::{ReplySink, ResilientTransport};
    use colloquy_core::ui::ConsoleReporter;
    use colloquy_types::llm::Message;
    use colloquy_types::persona::ColorToken;

    use super::*;

    /// Read one HTTP/1.1 request, honoring Content-Length.
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Serve one canned raw response per connection, in order.
    async fn stub_server(responses: Vec<String>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut socket).await);
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
            requests
        });
        (base_url, handle)
    }

    fn http(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/x-ndjson\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn ndjson(fragments: &[&str]) -> String {
        let mut body = String::new();
        for f in fragments {
            let line = serde_json::json!({
                "message": {"role": "assistant", "content": f},
                "done": false,
            });
            body.push_str(&line.to_string());
            body.push('\n');
        }
        body.push_str("{\"done\":true}\n");
        body
    }

    fn backend(base_url: &str) -> OllamaBackend {
        OllamaBackend::new(&BackendConfig {
            base_url: base_url.to_string(),
            probe_timeout_secs: 1,
            ..BackendConfig::default()
        })
        .unwrap()
    }

    fn request() -> ChatRequest {
        ChatRequest::streaming("llama3.2", vec![Message::system("be brief"), Message::user("hi")])
    }

    #[tokio::test]
    async fn test_probe_hits_tags_endpoint() {
        let (base_url, server) = stub_server(vec![http("200 OK", "{\"models\":[]}")]).await;
        backend(&base_url).probe().await.unwrap();

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("GET /api/tags HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_probe_connection_refused_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = backend(&base_url).probe().await.unwrap_err();
        assert!(matches!(err, ConversationError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_probe_times_out_on_silent_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let start = std::time::Instant::now();
        let err = backend(&base_url).probe().await.unwrap_err();
        assert!(matches!(err, ConversationError::BackendUnavailable(_)));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_probe_non_success_is_unavailable() {
        let (base_url, _server) = stub_server(vec![http("502 Bad Gateway", "")]).await;
        let err = backend(&base_url).probe().await.unwrap_err();
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn test_open_chat_streams_ndjson() {
        let (base_url, server) = stub_server(vec![http("200 OK", &ndjson(&["Hel", "lo"]))]).await;
        let stream = backend(&base_url).open_chat(&request()).await.unwrap();
        let decoded = StreamDecoder::decode(stream, &CancellationToken::new(), |_| {})
            .await
            .unwrap();
        assert_eq!(decoded.text(), "Hello");

        let requests = server.await.unwrap();
        let raw = &requests[0];
        assert!(raw.starts_with("POST /api/chat HTTP/1.1"));
        let body = &raw[raw.find("\r\n\r\n").unwrap() + 4..];
        let sent: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(sent["model"], "llama3.2");
        assert_eq!(sent["stream"], true);
        assert_eq!(sent["messages"].as_array().unwrap().len(), 2);
        assert_eq!(sent["messages"][0]["role"], "system");
    }

    #[tokio::test]
    async fn test_open_chat_unknown_model_is_application_error() {
        let (base_url, _server) = stub_server(vec![http(
            "404 Not Found",
            r#"{"error":"model \"llama3.2\" not found, try pulling it first"}"#,
        )])
        .await;
        let err = backend(&base_url).open_chat(&request()).await.err().unwrap();
        assert!(matches!(err, ConversationError::Application(_)));
    }

    #[tokio::test]
    async fn test_open_chat_server_error_is_transport() {
        let (base_url, _server) = stub_server(vec![http("503 Service Unavailable", "busy")]).await;
        let err = backend(&base_url).open_chat(&request()).await.err().unwrap();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_truncated_body_is_transport_error() {
        let partial = ndjson(&["Hel"]);
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            partial.len() + 500,
            partial.lines().next().unwrap()
        );
        let (base_url, _server) = stub_server(vec![response]).await;

        let stream = backend(&base_url).open_chat(&request()).await.unwrap();
        let err = StreamDecoder::decode(stream, &CancellationToken::new(), |_| {})
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    struct QuietReporter;

    impl ConsoleReporter for QuietReporter {
        fn line(&self, _text: &str, _color: ColorToken) {}
        fn fragment(&self, _text: &str, _color: ColorToken) {}
    }

    struct Collect(String);

    impl ReplySink for Collect {
        fn fragment(&mut self, text: &str) {
            self.0.push_str(text);
        }
    }

    #[tokio::test]
    async fn test_transport_retries_against_live_server() {
        let (base_url, server) = stub_server(vec![
            http("200 OK", "{\"models\":[]}"),
            http("503 Service Unavailable", ""),
            http("200 OK", &ndjson(&["recovered"])),
        ])
        .await;

        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(20),
            ..RetryPolicy::default()
        };
        let transport =
            ResilientTransport::new(backend(&base_url), policy, Arc::new(QuietReporter));
        let mut sink = Collect(String::new());

        let decoded = transport
            .exchange(&request(), &CancellationToken::new(), &mut sink)
            .await
            .unwrap();

        assert_eq!(decoded.text(), "recovered");
        assert_eq!(sink.0, "recovered");
        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("GET /api/tags"));
        assert!(requests[1].starts_with("POST /api/chat"));
        assert!(requests[2].starts_with("POST /api/chat"));
    }
}
