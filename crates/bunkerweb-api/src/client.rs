// BunkerWeb control-plane HTTP client
//
// Wraps `reqwest::Client` with endpoint normalization, authentication, and
// envelope classification. Endpoint groups (services, configs, bans, ...)
// are implemented as inherent methods in `crate::endpoints` so this module
// stays focused on transport mechanics.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder};
use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::auth::{AuthScheme, AuthState, Credentials};
use crate::envelope;
use crate::error::Error;
use crate::keys::check_segment;
use crate::multipart::MultipartBody;
use crate::transport::TransportConfig;

/// Query parameters as `(name, value)` pairs, in send order.
pub(crate) type Query<'a> = &'a [(&'static str, String)];

/// Async client for one BunkerWeb control plane.
///
/// Safe to share across tasks: the only mutable state is the bearer token
/// stored by [`login`](Self::login).
#[derive(Debug)]
pub struct BunkerWebClient {
    http: reqwest::Client,
    base_url: Url,
    auth: AuthState,
}

impl BunkerWebClient {
    /// Create a client for `endpoint`, building the HTTP stack from `transport`.
    ///
    /// The endpoint may omit its scheme (`https` is assumed) and its trailing
    /// slash; both are normalized here.
    pub fn new(
        endpoint: &str,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(http, endpoint, credentials)
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        endpoint: &str,
        credentials: Credentials,
    ) -> Result<Self, Error> {
        let base_url = normalize_endpoint(endpoint)?;
        debug!(base_url = %redacted(&base_url), "created control-plane client");
        Ok(Self {
            http,
            base_url,
            auth: AuthState::new(credentials),
        })
    }

    /// The normalized base URL (always ends with `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The scheme the next request will authenticate with.
    pub fn auth_scheme(&self) -> AuthScheme {
        self.auth.scheme()
    }

    /// Whether a bearer token is configured (statically or via login).
    pub fn has_token(&self) -> bool {
        self.auth.scheme() == AuthScheme::Bearer
    }

    pub(crate) fn store_token(&self, token: SecretString) {
        self.auth.set_token(token);
    }

    // ── URL construction ─────────────────────────────────────────────

    /// Join path segments onto the base URL.
    ///
    /// Each segment is percent-encoded on its own, so identifiers containing
    /// `/`, `?` or `#` cannot change the request's shape. `.` and `..` would
    /// be dropped by the URL parser and are rejected instead.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url, Error> {
        for segment in segments {
            check_segment(segment, "path segment")?;
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::validation(format!("endpoint {} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Start an authenticated request.
    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.auth.apply(self.http.request(method, url))
    }

    /// Send a request without a body.
    pub(crate) async fn send_empty<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &[&str],
        query: Query<'_>,
    ) -> Result<Option<T>, Error> {
        let builder = with_query(self.request(method, self.url(path)?), query);
        self.execute(builder).await
    }

    /// Send a request with a JSON body.
    pub(crate) async fn send_json<T, B>(
        &self,
        method: Method,
        path: &[&str],
        query: Query<'_>,
        body: &B,
    ) -> Result<Option<T>, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = with_query(self.request(method, self.url(path)?), query);
        self.execute(json_body(builder, body)?).await
    }

    /// Send a request with a multipart body.
    pub(crate) async fn send_multipart<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &[&str],
        form: MultipartBody,
    ) -> Result<Option<T>, Error> {
        let builder = self
            .request(method, self.url(path)?)
            .header(CONTENT_TYPE, form.content_type)
            .body(form.body);
        self.execute(builder).await
    }

    /// Send a prepared request and classify the response.
    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<Option<T>, Error> {
        let request = builder.build()?;
        debug!("{} {}", request.method(), redacted(request.url()));

        let resp = self.http.execute(request).await?;
        let status = resp.status();
        let body = resp.text().await?;
        trace!(status = status.as_u16(), bytes = body.len(), "response received");

        envelope::decode_data(envelope::classify(status, &body)?)
    }
}

/// Serialize `body` as the request's JSON payload.
pub(crate) fn json_body<B: Serialize + ?Sized>(
    builder: RequestBuilder,
    body: &B,
) -> Result<RequestBuilder, Error> {
    let bytes = serde_json::to_vec(body).map_err(Error::Encode)?;
    Ok(builder.header(CONTENT_TYPE, "application/json").body(bytes))
}

fn with_query(builder: RequestBuilder, query: Query<'_>) -> RequestBuilder {
    if query.is_empty() {
        builder
    } else {
        builder.query(query)
    }
}

/// The resource a write or read returned, or `fallback` when the success
/// envelope carried none. The call itself succeeded either way.
pub(crate) fn returned_or<T>(data: Option<T>, what: &str, fallback: impl FnOnce() -> T) -> T {
    data.unwrap_or_else(|| {
        debug!(what, "success response carried no payload, echoing the request");
        fallback()
    })
}

/// Unwrap a payload the endpoint cannot succeed without.
pub(crate) fn require<T>(data: Option<T>, what: &str) -> Result<T, Error> {
    data.ok_or_else(|| Error::Deserialization {
        message: format!("response carried no {what}"),
        body: String::new(),
    })
}

/// `url` without its `user:pass@` part, for logs.
fn redacted(url: &Url) -> Url {
    let mut shown = url.clone();
    // Both only fail for cannot-be-a-base URLs, which carry no credentials.
    let _ = shown.set_username("");
    let _ = shown.set_password(None);
    shown
}

/// Default the scheme to `https` and force a trailing slash.
fn normalize_endpoint(endpoint: &str) -> Result<Url, Error> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("endpoint must be provided"));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    };

    let mut url = Url::parse(&with_scheme)?;
    if url.cannot_be_a_base() {
        return Err(Error::validation(format!("endpoint {trimmed} is not a base URL")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
