//! The `{code, msg, data}` envelope around non-streaming responses.

use graphlens_types::TransportError;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Value,
}

/// Decode an enveloped response body and return its `data`.
///
/// A non-zero `code` is a failure regardless of the HTTP status; token
/// codes become [`TransportError::Unauthorized`]. A missing or `null` `data`
/// decodes into `T` as JSON `null`, which suits `()`, `Option<_>` and
/// [`Value`].
pub(crate) fn open_envelope<T: DeserializeOwned>(body: &str) -> Result<T, TransportError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| TransportError::Decode(format!("invalid response envelope: {e}")))?;

    if envelope.code != 0 {
        tracing::debug!(code = envelope.code, msg = ?envelope.msg, "backend rejected request");
        return Err(TransportError::from_envelope(
            envelope.code,
            envelope.msg.unwrap_or_default(),
        ));
    }

    serde_json::from_value(envelope.data)
        .map_err(|e| TransportError::Decode(format!("unexpected response data: {e}")))
}
