// Response envelope decoding
//
// Every control-plane response is wrapped as `{status, message, data}`.
// Decoding is two-step: the body is parsed into a generic envelope whose
// `data` is an untyped `serde_json::Value`, and only after the outcome is
// classified is `data` converted into the caller's destination type.

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Error;

/// The uniform response wrapper.
///
/// All fields are optional on the wire: a JSON object lacking `status` still
/// parses, and is then classified as a failure.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

impl Envelope {
    fn is_success_status(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("ok") || s.eq_ignore_ascii_case("success"))
    }
}

/// Classify a raw HTTP response.
///
/// Returns the untyped `data` payload on success (`None` when the body is
/// empty or `data` is absent/null), or the appropriate error otherwise.
pub(crate) fn classify(status: StatusCode, body: &str) -> Result<Option<Value>, Error> {
    let http_ok = status.is_success();

    if body.is_empty() {
        return if http_ok {
            Ok(None)
        } else {
            Err(api_error(status, status_line(status)))
        };
    }

    let envelope: Envelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) if http_ok => {
            let preview = &body[..floor_char_boundary(body, 200)];
            return Err(Error::Deserialization {
                message: format!("decode response envelope: {e} (body preview: {preview:?})"),
                body: body.to_owned(),
            });
        }
        Err(_) => {
            let raw = body.trim();
            let message = if raw.is_empty() {
                status_line(status)
            } else {
                raw.to_owned()
            };
            return Err(api_error(status, message));
        }
    };

    if !http_ok || !envelope.is_success_status() {
        let message = envelope
            .message
            .filter(|m| !m.is_empty())
            .or_else(|| Some(body.trim().to_owned()).filter(|m| !m.is_empty()))
            .unwrap_or_else(|| status_line(status));
        return Err(api_error(status, message));
    }

    Ok(envelope.data.filter(|d| !d.is_null()))
}

/// Convert an untyped payload into the destination type.
///
/// A missing payload is not an error: the destination is simply left unset.
pub(crate) fn decode_data<T: DeserializeOwned>(data: Option<Value>) -> Result<Option<T>, Error> {
    let Some(value) = data else {
        return Ok(None);
    };
    T::deserialize(&value)
        .map(Some)
        .map_err(|e| Error::Deserialization {
            message: format!("decode response payload: {e}"),
            body: value.to_string(),
        })
}

fn api_error(status: StatusCode, message: String) -> Error {
    tracing::debug!(status = status.as_u16(), %message, "control plane returned an error");
    Error::Api {
        status: status.as_u16(),
        message,
    }
}

/// `"404 Not Found"`, mirroring the HTTP status line.
fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}
