//! Response classification and body adaptation for the chat endpoint.

use futures_util::StreamExt;
use reqwest::StatusCode;

use colloquy_core::llm::backend::ByteStream;
use colloquy_types::error::ConversationError;
use colloquy_types::llm::BackendErrorBody;

/// Adapt a successful response body into the backend-neutral byte stream.
///
/// Read failures after the status line surface as
/// [`ConversationError::Transport`] so the transport can replay the request.
pub fn body_stream(response: reqwest::Response) -> ByteStream {
    Box::pin(async_stream::try_stream! {
        let mut bytes = response.bytes_stream();
        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|e| {
                ConversationError::Transport(format!("response body read: {e}"))
            })?;
            yield chunk.to_vec();
        }
    })
}

/// Map a failed request (no status line received) to an error.
pub fn classify_send_error(err: reqwest::Error) -> ConversationError {
    if err.is_timeout() {
        ConversationError::Transport(format!("request timed out: {err}"))
    } else if err.is_connect() {
        ConversationError::Transport(format!("connection failed: {err}"))
    } else {
        ConversationError::Transport(format!("HTTP request failed: {err}"))
    }
}

/// Map a non-2xx response to an error.
///
/// A structured `{"error": "..."}` body means the server understood the
/// request and rejected it (unknown model, bad payload), so it is never
/// retried. Without one, 5xx, 408 and 429 are treated as transient.
pub fn classify_status(status: StatusCode, body: &str) -> ConversationError {
    if let Ok(structured) = serde_json::from_str::<BackendErrorBody>(body) {
        return ConversationError::Application(structured.error);
    }

    let body = body.trim();
    let detail = if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    };

    match status {
        s if s.is_server_error() => ConversationError::Transport(detail),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            ConversationError::Transport(detail)
        }
        _ => ConversationError::Application(detail),
    }
}
