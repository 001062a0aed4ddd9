use std::sync::{PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

/// Which `Authorization` scheme a request will carry.
///
/// Marker enum (no data) -- the actual secrets live in [`Credentials`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <token>`.
    Bearer,
    /// `Authorization: Basic <base64(user:pass)>`.
    Basic,
    /// No `Authorization` header at all.
    Anonymous,
}

/// Static credentials chosen when the client is built.
#[derive(Debug, Clone, Default)]
pub enum Credentials {
    /// API token sent as a bearer token.
    Token(SecretString),

    /// Username and password sent with HTTP Basic auth.
    Basic {
        username: String,
        password: SecretString,
    },

    /// Unauthenticated (public endpoints, or a client that will `login()` first).
    #[default]
    Anonymous,
}

impl Credentials {
    pub fn token(token: impl Into<String>) -> Self {
        Self::Token(SecretString::from(token.into()))
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Per-client authentication state.
///
/// The bearer token is the only mutable piece: `login()` replaces it and
/// every later request picks up the new value. Readers take the lock just
/// long enough to stamp a header, so in-flight requests see either the old
/// token or the new one, never a torn value.
#[derive(Debug)]
pub(crate) struct AuthState {
    token: RwLock<Option<SecretString>>,
    basic: Option<(String, SecretString)>,
}

impl AuthState {
    pub(crate) fn new(credentials: Credentials) -> Self {
        match credentials {
            Credentials::Token(token) if !token.expose_secret().is_empty() => Self {
                token: RwLock::new(Some(token)),
                basic: None,
            },
            Credentials::Basic { username, password }
                if !username.is_empty() && !password.expose_secret().is_empty() =>
            {
                Self {
                    token: RwLock::new(None),
                    basic: Some((username, password)),
                }
            }
            _ => Self {
                token: RwLock::new(None),
                basic: None,
            },
        }
    }

    /// The scheme the next request will use. A token always wins.
    pub(crate) fn scheme(&self) -> AuthScheme {
        if self.read_token().is_some() {
            AuthScheme::Bearer
        } else if self.basic.is_some() {
            AuthScheme::Basic
        } else {
            AuthScheme::Anonymous
        }
    }

    pub(crate) fn set_token(&self, token: SecretString) {
        debug!("storing bearer token from login");
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    /// Stamp the configured `Authorization` header onto a request.
    pub(crate) fn apply(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = self.read_token() {
            return builder.bearer_auth(token.expose_secret());
        }
        match &self.basic {
            Some((username, password)) => {
                builder.basic_auth(username, Some(password.expose_secret()))
            }
            None => builder,
        }
    }

    fn read_token(&self) -> Option<SecretString> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
