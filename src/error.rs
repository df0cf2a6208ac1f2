//! Error types for wallpaper generation.

use std::time::Duration;

/// Errors that can occur while talking to the generative-media API.
#[derive(Debug, thiserror::Error)]
pub enum VibeGenError {
    /// API key missing or could not be resolved.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The API key was rejected or invalidated by the remote service.
    ///
    /// Distinguished from [`Auth`](Self::Auth) so callers can re-prompt for
    /// key selection instead of showing a raw remote message.
    #[error("API key is invalid; select a valid key to continue")]
    InvalidApiKey,

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code of the response.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested wait from the `Retry-After` header, if the server sent one.
        retry_after: Option<Duration>,
    },

    /// Polling deadline exceeded before the remote job finished.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The caller cancelled an in-flight operation.
    #[error("operation cancelled")]
    Cancelled,

    /// Content was blocked by safety filters, or the result list came back
    /// empty (the remote signal for a rejected prompt).
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// The response did not have the expected shape (e.g. a finished video
    /// operation with no download link).
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Video generation specific error reported by the operation itself.
    #[error("video generation failed: {0}")]
    VideoGeneration(String),

    /// I/O error (e.g., saving file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VibeGenError {
    /// Returns true if this error is likely transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Network(_)
        )
    }

    /// Returns the suggested retry delay, if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            Self::Timeout(_) => Some(Duration::from_secs(1)),
            Self::Network(_) => Some(Duration::from_secs(2)),
            _ => None,
        }
    }
}

/// Result type alias for wallpaper generation operations.
pub type Result<T> = std::result::Result<T, VibeGenError>;

/// Google error envelope: `{"error": {"code": .., "message": .., "status": ..}}`.
#[derive(Debug, serde::Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorBody,
}

#[derive(Debug, serde::Deserialize)]
struct GoogleErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Extracts a readable message from an error response body.
///
/// Google APIs wrap errors in a JSON envelope; when the body parses as one,
/// the inner message is returned. Raw bodies are truncated so HTML error
/// pages do not end up in user-facing messages.
pub(crate) fn sanitize_error_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<GoogleErrorEnvelope>(body) {
        if let Some(message) = envelope.error.message {
            return message;
        }
    }
    let trimmed = body.trim();
    if trimmed.len() > 300 {
        let cut = trimmed
            .char_indices()
            .take_while(|(i, _)| *i <= 300)
            .last()
            .map(|(i, _)| i)
            .unwrap_or(0);
        format!("{}...", &trimmed[..cut])
    } else {
        trimmed.to_string()
    }
}

/// Classifies a non-success response from a Google generative-media endpoint
/// into a tagged error variant.
///
/// The invalid-key signatures (`API key not valid`, `Requested entity was not
/// found`, `UNAUTHENTICATED`) map to [`VibeGenError::InvalidApiKey`] so
/// callers never have to match on message text themselves.
pub(crate) fn classify_google_error(
    status: u16,
    body: &str,
    headers: &reqwest::header::HeaderMap,
) -> VibeGenError {
    let envelope_status = serde_json::from_str::<GoogleErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error.status);
    let message = sanitize_error_message(body);

    if is_invalid_key_signature(status, envelope_status.as_deref(), &message) {
        return VibeGenError::InvalidApiKey;
    }
    if status == 429 {
        let retry_after = parse_retry_after(headers).map(Duration::from_secs);
        return VibeGenError::RateLimited { retry_after };
    }
    if status == 401 || status == 403 {
        return VibeGenError::Auth(message);
    }
    let lower = message.to_lowercase();
    if lower.contains("safety")
        || lower.contains("blocked")
        || lower.contains("content_policy")
        || lower.contains("prohibited")
    {
        return VibeGenError::ContentBlocked(message);
    }
    VibeGenError::Api { status, message }
}

/// Matches the remote signatures of an invalidated credential.
fn is_invalid_key_signature(status: u16, envelope_status: Option<&str>, message: &str) -> bool {
    if envelope_status == Some("UNAUTHENTICATED") {
        return true;
    }
    if message.contains("API key not valid") {
        return true;
    }
    // Polling an operation that belongs to a revoked key returns NOT_FOUND.
    if (status == 404 || envelope_status == Some("NOT_FOUND"))
        && message.contains("Requested entity was not found")
    {
        return true;
    }
    false
}

/// Parses a `Retry-After` header value in seconds, if present.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}
