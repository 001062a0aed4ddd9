//! Shared configuration for BunkerWeb API consumers.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! logging setup, and translation into a ready `BunkerWebClient`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use bunkerweb_api::{BunkerWebClient, Credentials, TlsMode, TransportConfig};

/// Overrides the profile's endpoint.
pub const ENDPOINT_ENV: &str = "BUNKERWEB_API_ENDPOINT";
/// Overrides every other token source.
pub const TOKEN_ENV: &str = "BUNKERWEB_API_TOKEN";
/// Fallback username when the profile has none.
pub const USERNAME_ENV: &str = "BUNKERWEB_API_USERNAME";
/// Overrides every other password source.
pub const PASSWORD_ENV: &str = "BUNKERWEB_API_PASSWORD";

const KEYRING_SERVICE: &str = "bunkerweb";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found in config")]
    NoProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to build client: {0}")]
    Client(#[from] bunkerweb_api::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named control-plane profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by name, falling back to `default_profile`.
    ///
    /// With no profiles configured at all, the default profile name resolves
    /// to built-in settings so a purely environment-driven setup still works.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
            .to_owned();

        if let Some(profile) = self.profiles.get(&name) {
            return Ok((name, profile.clone()));
        }
        if self.profiles.is_empty() && Some(name.as_str()) == self.default_profile.as_deref() {
            return Ok((name, Profile::default()));
        }
        Err(ConfigError::NoProfile { profile: name })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub skip_tls_verify: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            skip_tls_verify: false,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

/// A named control-plane profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// API base URL (e.g. "https://bunkerweb.example.com:5000/api").
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API token (plaintext; prefer keyring or env var).
    pub api_token: Option<String>,

    /// Environment variable name containing the API token.
    pub api_token_env: Option<String>,

    /// Username for Basic auth.
    pub username: Option<String>,

    /// Password for Basic auth (plaintext; prefer keyring).
    pub password: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override `defaults.skip_tls_verify`.
    pub skip_tls_verify: Option<bool>,

    /// Override `defaults.timeout`.
    pub timeout: Option<u64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_token: None,
            api_token_env: None,
            username: None,
            password: None,
            ca_cert: None,
            skip_tls_verify: None,
            timeout: None,
        }
    }
}

fn default_endpoint() -> String {
    "https://127.0.0.1:5000/api".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "bunkerweb", "bunkerweb").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("bunkerweb");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Loading and saving ──────────────────────────────────────────────

/// Load the config from the canonical path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load defaults, then `path` (if present), then `BUNKERWEB_*` variables.
///
/// Nested keys use a double underscore:
/// `BUNKERWEB_PROFILES__PROD__ENDPOINT` sets `profiles.prod.endpoint`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("BUNKERWEB_").split("__"))
        .extract()?;
    Ok(config)
}

/// Serialize config to TOML at the canonical path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(cfg)?)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Endpoint for a profile; `BUNKERWEB_API_ENDPOINT` wins when set.
pub fn resolve_endpoint(profile: &Profile) -> String {
    env_nonempty(ENDPOINT_ENV).unwrap_or_else(|| profile.endpoint.clone())
}

/// Resolve an API token: `BUNKERWEB_API_TOKEN`, the profile's
/// `api_token_env`, the system keyring, then plaintext.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    if let Some(token) = env_nonempty(TOKEN_ENV) {
        return Some(SecretString::from(token));
    }

    if let Some(token) = profile.api_token_env.as_deref().and_then(env_nonempty) {
        return Some(SecretString::from(token));
    }

    if let Some(token) = keyring_secret(&format!("{profile_name}/api-token")) {
        return Some(SecretString::from(token));
    }

    profile
        .api_token
        .clone()
        .filter(|t| !t.is_empty())
        .map(SecretString::from)
}

/// Resolve a password: `BUNKERWEB_API_PASSWORD`, the keyring, then plaintext.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    if let Some(pw) = env_nonempty(PASSWORD_ENV) {
        return Some(SecretString::from(pw));
    }

    if let Some(pw) = keyring_secret(&format!("{profile_name}/password")) {
        return Some(SecretString::from(pw));
    }

    profile
        .password
        .clone()
        .filter(|p| !p.is_empty())
        .map(SecretString::from)
}

/// Pick the auth scheme for a profile: a token if one resolves, otherwise
/// username + password, otherwise anonymous.
pub fn resolve_credentials(profile: &Profile, profile_name: &str) -> Credentials {
    if let Some(token) = resolve_token(profile, profile_name) {
        return Credentials::Token(token);
    }

    let username = profile
        .username
        .clone()
        .filter(|u| !u.trim().is_empty())
        .or_else(|| env_nonempty(USERNAME_ENV));
    match (username, resolve_password(profile, profile_name)) {
        (Some(username), Some(password)) => Credentials::Basic { username, password },
        _ => {
            debug!(profile = profile_name, "no credentials resolved, using anonymous access");
            Credentials::Anonymous
        }
    }
}

/// TLS mode and timeout for a profile, with `defaults` filling the gaps.
pub fn transport_config(profile: &Profile, defaults: &Defaults) -> TransportConfig {
    let tls = if profile.skip_tls_verify.unwrap_or(defaults.skip_tls_verify) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };

    TransportConfig::default()
        .with_tls(tls)
        .with_timeout(Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)))
}

/// Build a client from a profile without re-reading the config file.
pub fn profile_to_client(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<BunkerWebClient, ConfigError> {
    let endpoint = resolve_endpoint(profile);
    if endpoint.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "endpoint".into(),
            reason: "must not be empty".into(),
        });
    }

    let credentials = resolve_credentials(profile, profile_name);
    let transport = transport_config(profile, defaults);
    Ok(BunkerWebClient::new(&endpoint, credentials, &transport)?)
}

/// Load the config and build a client for `profile_name` (or the default).
pub fn build_client(profile_name: Option<&str>) -> Result<BunkerWebClient, ConfigError> {
    let config = load_config()?;
    let (name, profile) = config.profile(profile_name)?;
    profile_to_client(&profile, &name, &config.defaults)
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn keyring_secret(entry: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, entry)
        .and_then(|e| e.get_password())
        .ok()
}

// ── Logging ─────────────────────────────────────────────────────────

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Install a global `tracing` subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence over `verbosity` (0 = warn .. 3+ = trace).
/// Returns `false` if a subscriber was already installed.
pub fn init_tracing(verbosity: u8, format: LogFormat) -> bool {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Text => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    }
}
