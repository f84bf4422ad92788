//! Internal error helpers for mapping HTTP/reqwest errors to [`TransportError`].

use std::time::Duration;

use graphlens_types::TransportError;

/// Map a non-success HTTP status to a [`TransportError`].
///
/// 401 and 403 mean the bearer token was rejected. The backend's error
/// bodies carry their message in `detail` or `msg`; that message is used for
/// [`TransportError::Unauthorized`], while [`TransportError::Status`] keeps
/// the body verbatim.
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: &str) -> TransportError {
    match status.as_u16() {
        401 | 403 => TransportError::Unauthorized(error_message(body)),
        code => TransportError::Status {
            status: code,
            body: body.to_string(),
        },
    }
}

/// Map a [`reqwest::Error`] to a [`TransportError`].
///
/// `timeout` is the limit the request ran under, if any.
pub(crate) fn map_reqwest_error(err: reqwest::Error, timeout: Option<Duration>) -> TransportError {
    match timeout {
        Some(limit) if err.is_timeout() => TransportError::Timeout(limit),
        _ => TransportError::Network(Box::new(err)),
    }
}

fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_string();
    };
    ["detail", "msg"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map_or_else(|| body.to_string(), str::to_string)
}
