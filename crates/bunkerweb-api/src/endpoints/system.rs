// Liveness and authentication endpoints

use reqwest::Method;
use secrecy::SecretString;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::client::{BunkerWebClient, json_body, require};
use crate::endpoints::identifier;
use crate::error::Error;
use crate::models::{LoginPayload, LoginRequest};

impl BunkerWebClient {
    /// `GET ping`
    pub async fn ping(&self) -> Result<Map<String, Value>, Error> {
        let payload: Option<Map<String, Value>> =
            self.send_empty(Method::GET, &["ping"], &[]).await?;
        Ok(payload.unwrap_or_default())
    }

    /// `GET health`
    pub async fn health(&self) -> Result<Map<String, Value>, Error> {
        let payload: Option<Map<String, Value>> =
            self.send_empty(Method::GET, &["health"], &[]).await?;
        Ok(payload.unwrap_or_default())
    }

    /// Exchange a username and password for an API token.
    ///
    /// `POST auth` with HTTP Basic auth, whatever this client was configured
    /// with. On success the token is stored and every later request on this
    /// client authenticates with `Bearer`.
    pub async fn login(&self, username: &str, password: &str) -> Result<SecretString, Error> {
        identifier(username, "username")?;
        identifier(password, "password")?;

        let url = self.url(&["auth"])?;
        debug!(username, "logging in");
        let builder = self
            .http()
            .post(url)
            .basic_auth(username, Some(password));
        let builder = json_body(builder, &LoginRequest { username, password })?;

        let payload: Option<LoginPayload> = self.execute(builder).await?;
        let token = require(payload, "login token")?.token;
        if token.is_empty() {
            return Err(Error::Deserialization {
                message: "login response carried an empty token".into(),
                body: String::new(),
            });
        }

        let token = SecretString::from(token);
        self.store_token(token.clone());
        info!(username, "logged in");
        Ok(token)
    }
}
