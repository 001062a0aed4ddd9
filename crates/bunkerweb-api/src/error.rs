use reqwest::StatusCode;
use thiserror::Error;

/// Top-level error type for the `bunkerweb-api` crate.
///
/// Four families: local validation (never touches the network), transport,
/// decoding, and failures reported by the control plane itself.
#[derive(Debug, Error)]
pub enum Error {
    // ── Local validation ────────────────────────────────────────────
    /// Malformed input caught before any I/O (empty batch, blank field,
    /// unknown enum value). Carries no status code.
    #[error("invalid request: {message}")]
    Validation { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, TLS).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// A request body could not be serialized.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    // ── Data ────────────────────────────────────────────────────────
    /// A success response carried a body that is not a valid envelope,
    /// or whose payload does not fit the requested shape.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Control plane ───────────────────────────────────────────────
    /// Failure reported by the control plane: a non-2xx status or an
    /// envelope whose `status` is not `ok`/`success`.
    #[error("bunkerweb api error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// HTTP status code of an API failure. `None` for every other family.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if the control plane reported the resource as absent.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND.as_u16())
    }

    /// Returns `true` for rejected credentials (HTTP 401).
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED.as_u16())
    }

    /// Returns `true` if this failure was detected locally, before any request.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// Treat "not found" as absence rather than failure.
///
/// Used for removal-on-read-miss and idempotent deletes. Every other error
/// is passed through untouched.
pub trait NotFoundExt<T> {
    /// `Ok(None)` when the resource is absent.
    fn found(self) -> Result<Option<T>, Error>;
}

impl<T> NotFoundExt<T> for Result<T, Error> {
    fn found(self) -> Result<Option<T>, Error> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Delete that succeeds when the target is already gone.
pub trait IdempotentDelete {
    fn ignore_not_found(self) -> Result<(), Error>;
}

impl IdempotentDelete for Result<(), Error> {
    fn ignore_not_found(self) -> Result<(), Error> {
        self.found().map(|_| ())
    }
}
