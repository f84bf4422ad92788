//! Error types for all graphlens crates.

use std::time::Duration;

use crate::id::LibId;

/// Envelope codes the backend uses for expired or invalid tokens.
pub const TOKEN_ERROR_CODES: [i64; 3] = [50008, 50012, 50014];

/// Errors from talking to the backend over HTTP.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    // Retryable errors
    /// Network-level error (connection reset, DNS failure, broken body).
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Request timed out.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // Terminal errors
    /// The server answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },
    /// A streaming response arrived without a body to read.
    #[error("response has no body")]
    MissingBody,
    /// The response envelope carried a non-zero code.
    #[error("api error {code}: {msg}")]
    Api {
        /// Envelope code.
        code: i64,
        /// Envelope message.
        msg: String,
    },
    /// The bearer token was rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The response body was not the JSON shape expected.
    #[error("decode error: {0}")]
    Decode(String),
}

impl TransportError {
    /// Whether this error is likely transient and the request can be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }

    /// Map an envelope code and message to the matching error.
    #[must_use]
    pub fn from_envelope(code: i64, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        if TOKEN_ERROR_CODES.contains(&code) {
            Self::Unauthorized(msg)
        } else {
            Self::Api { code, msg }
        }
    }
}

/// A failure reported to a stream's error callback.
#[derive(Debug, thiserror::Error)]
pub enum StreamFailure {
    /// The transport broke; no more records will arrive.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
    /// The server sent an in-band error record; the stream stays open.
    #[error("server error: {0}")]
    Sentinel(String),
}

impl StreamFailure {
    /// Whether the stream can still deliver records after this failure.
    #[must_use]
    pub fn is_in_band(&self) -> bool {
        matches!(self, Self::Sentinel(_))
    }
}

/// Errors from the query session orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A job is already running; the new submission was rejected.
    #[error("a query job is already running for library {lib_id}")]
    JobRunning {
        /// Library the running job belongs to.
        lib_id: LibId,
    },
    /// The query text was empty after trimming.
    #[error("query text is empty")]
    EmptyQuery,
    /// The search config has no library to search.
    #[error("no knowledge library selected")]
    MissingLibrary,
    /// There is no running job to drive.
    #[error("no query job is running")]
    NoActiveJob,
    /// The server refused or failed to cancel; the job keeps running.
    #[error("failed to cancel job for library {lib_id}: {source}")]
    CancelFailed {
        /// Library the job belongs to.
        lib_id: LibId,
        /// Why the cancel request failed.
        #[source]
        source: TransportError,
    },
    /// A non-streaming request failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
