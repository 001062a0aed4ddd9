// Control-plane resource types
//
// Response types use `#[serde(default)]` liberally: the control plane omits
// empty fields (config `data` outside `with_data` listings, ban `service`
// for unscoped bans). Request types skip `None` fields so a PATCH only
// carries what the caller set.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::keys::{BanKey, ConfigKey};

// ── Services ─────────────────────────────────────────────────────────

/// A protected site. `id` is derived by the control plane from `server_name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub server_name: String,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ServiceCreateRequest {
    pub server_name: String,
    pub is_draft: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ServiceUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_draft: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<BTreeMap<String, String>>,
}

/// Target state for `POST services/{id}/convert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertTarget {
    Online,
    Draft,
}

impl ConvertTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Draft => "draft",
        }
    }
}

impl fmt::Display for ConvertTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConvertTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "draft" => Ok(Self::Draft),
            _ => Err(Error::validation("convert_to must be 'online' or 'draft'")),
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct ServicePayload {
    #[serde(default)]
    pub service: Option<Service>,
}

#[derive(Deserialize)]
pub(crate) struct ServicesPayload {
    #[serde(default)]
    pub services: Vec<Service>,
}

// ── Instances ────────────────────────────────────────────────────────

/// A BunkerWeb worker instance, identified by hostname.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen_https: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub https_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl Instance {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ..Self::default()
        }
    }
}

/// Body of `POST instances`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstanceCreateRequest {
    pub hostname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen_https: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl InstanceCreateRequest {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ..Self::default()
        }
    }
}

impl From<&InstanceCreateRequest> for Instance {
    fn from(request: &InstanceCreateRequest) -> Self {
        Self {
            hostname: request.hostname.trim().to_owned(),
            name: request.name.clone(),
            port: request.port,
            listen_https: request.listen_https,
            https_port: request.https_port,
            server_name: request.server_name.clone(),
            method: request.method.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InstanceUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen_https: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl InstanceUpdateRequest {
    /// The instance as this update leaves it, as far as the request says.
    pub(crate) fn applied_to(&self, hostname: &str) -> Instance {
        Instance {
            hostname: hostname.to_owned(),
            name: self.name.clone(),
            port: self.port,
            listen_https: self.listen_https,
            https_port: self.https_port,
            server_name: self.server_name.clone(),
            method: self.method.clone(),
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct InstancePayload {
    #[serde(default)]
    pub instance: Option<Instance>,
}

#[derive(Deserialize)]
pub(crate) struct InstancesPayload {
    #[serde(default)]
    pub instances: Vec<Instance>,
}

// ── Global config ────────────────────────────────────────────────────

/// One key of the flat global settings map.
///
/// PATCH semantics are a shallow merge: a non-null value sets the key,
/// `null` resets it to the control plane's default.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalConfigSetting {
    key: String,
    value: Value,
}

impl GlobalConfigSetting {
    pub fn new(key: &str, value: Value) -> Result<Self, Error> {
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::validation("global config key cannot be empty"));
        }
        Ok(Self {
            key: key.to_owned(),
            value,
        })
    }

    /// Build from a plain string, inferring bools and numbers.
    pub fn from_scalar(key: &str, raw: &str) -> Result<Self, Error> {
        Self::new(key, parse_scalar_value(raw))
    }

    /// Project one key out of a settings map. Absent and `null` are both "unset".
    pub fn from_settings(key: &str, settings: &Map<String, Value>) -> Option<Self> {
        let key = key.trim();
        settings
            .get(key)
            .filter(|v| !v.is_null())
            .map(|v| Self {
                key: key.to_owned(),
                value: v.clone(),
            })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Partial map that sets this key.
    pub fn patch(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(self.key.clone(), self.value.clone());
        map
    }

    /// Partial map that resets `key`.
    pub fn reset(key: &str) -> Result<Map<String, Value>, Error> {
        Ok(Self::new(key, Value::Null)?.patch())
    }
}

/// Interpret a user-supplied string as the most specific JSON scalar.
///
/// `"true"`/`"false"` (any case) become booleans, integers and floats become
/// numbers, a blank string stays empty, anything else is kept verbatim.
pub fn parse_scalar_value(input: &str) -> Value {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Value::String(String::new());
    }

    match trimmed.to_lowercase().as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::from(i);
    }
    if let Some(n) = trimmed
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
    {
        return Value::Number(n);
    }

    Value::String(input.to_owned())
}

// ── Configs ──────────────────────────────────────────────────────────

/// A custom configuration snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: String,
    #[serde(rename = "type")]
    pub config_type: String,
    pub name: String,
    /// Only populated when the request asked for data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl Config {
    /// A config carrying exactly `key` and `data`, with no method recorded.
    pub fn from_key(key: &ConfigKey, data: Option<String>) -> Self {
        Self {
            service: key.scope().as_str().to_owned(),
            config_type: key.config_type().to_owned(),
            name: key.name().to_owned(),
            data,
            method: None,
        }
    }

    /// The composite identity, with the service normalized.
    pub fn key(&self) -> Result<ConfigKey, Error> {
        ConfigKey::new(Some(&self.service), &self.config_type, &self.name)
    }
}

#[derive(Serialize)]
pub(crate) struct ConfigCreateRequest<'a> {
    #[serde(flatten)]
    pub key: &'a ConfigKey,
    pub data: &'a str,
}

/// Partial `PATCH configs/{service}/{type}/{name}` body. Setting any of
/// `service`, `config_type` or `name` moves the config in the same call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub config_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl ConfigUpdateRequest {
    /// Replace the content only.
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.service.is_none()
            && self.config_type.is_none()
            && self.name.is_none()
            && self.data.is_none()
    }

    /// Key the config has once this update is applied to `current`.
    pub fn target(&self, current: &ConfigKey) -> Result<ConfigKey, Error> {
        current.relocated(
            self.service.as_deref(),
            self.config_type.as_deref(),
            self.name.as_deref(),
        )
    }
}

/// Filters for `GET configs`. Blank service/type filters are dropped.
#[derive(Debug, Clone, Default)]
pub struct ConfigListOptions {
    pub service: Option<String>,
    pub config_type: Option<String>,
    pub with_drafts: Option<bool>,
    pub with_data: Option<bool>,
}

impl ConfigListOptions {
    pub(crate) fn query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(service) = non_blank(self.service.as_deref()) {
            params.push(("service", service.to_owned()));
        }
        if let Some(config_type) = non_blank(self.config_type.as_deref()) {
            params.push(("type", config_type.to_owned()));
        }
        if let Some(with_drafts) = self.with_drafts {
            params.push(("with_drafts", with_drafts.to_string()));
        }
        if let Some(with_data) = self.with_data {
            params.push(("with_data", with_data.to_string()));
        }
        params
    }
}

#[derive(Deserialize)]
pub(crate) struct ConfigPayload {
    #[serde(default)]
    pub config: Option<Config>,
}

#[derive(Deserialize)]
pub(crate) struct ConfigsPayload {
    #[serde(default)]
    pub configs: Vec<Config>,
}

// ── Bans ─────────────────────────────────────────────────────────────

/// An active IP ban. `exp` is the remaining lifetime in seconds, 0 = permanent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ban {
    pub ip: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl Ban {
    pub fn key(&self) -> Result<BanKey, Error> {
        BanKey::new(&self.ip, self.service.as_deref())
    }
}

/// One item of `POST bans` / `POST bans/ban`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BanRequest {
    ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    service: Option<String>,
}

impl BanRequest {
    pub fn new(key: &BanKey) -> Self {
        Self {
            ip: key.ip().to_owned(),
            exp: None,
            reason: None,
            service: key.scope().service().map(str::to_owned),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Ban lifetime in seconds; `0` bans permanently.
    pub fn with_expiration(mut self, seconds: i64) -> Self {
        self.exp = Some(seconds);
        self
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }
}

/// One item of `DELETE bans` / `POST bans/unban`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnbanRequest {
    ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    service: Option<String>,
}

impl From<&BanKey> for UnbanRequest {
    fn from(key: &BanKey) -> Self {
        Self {
            ip: key.ip().to_owned(),
            service: key.scope().service().map(str::to_owned),
        }
    }
}

impl From<BanKey> for UnbanRequest {
    fn from(key: BanKey) -> Self {
        Self::from(&key)
    }
}

#[derive(Deserialize)]
pub(crate) struct BansPayload {
    #[serde(default)]
    pub bans: Vec<Ban>,
}

// ── Plugins ──────────────────────────────────────────────────────────

/// An installed plugin. Uploaded plugins take their id from the package name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plugin {
    pub id: String,
    #[serde(rename = "type")]
    pub plugin_type: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize)]
pub(crate) struct PluginsPayload {
    #[serde(default)]
    pub plugins: Vec<Plugin>,
}

// ── Cache ────────────────────────────────────────────────────────────

/// A file produced by a job and cached by the control plane. Read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(default)]
    pub service: String,
    pub plugin: String,
    pub job_name: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Filters for `GET cache`.
#[derive(Debug, Clone, Default)]
pub struct CacheFilter {
    pub service: Option<String>,
    pub plugin: Option<String>,
    pub job_name: Option<String>,
    pub with_data: bool,
}

impl CacheFilter {
    pub(crate) fn query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        for (name, value) in [
            ("service", &self.service),
            ("plugin", &self.plugin),
            ("job_name", &self.job_name),
        ] {
            if let Some(v) = non_blank(value.as_deref()) {
                params.push((name, v.to_owned()));
            }
        }
        if self.with_data {
            params.push(("with_data", "true".to_owned()));
        }
        params
    }
}

#[derive(Deserialize)]
pub(crate) struct CachePayload {
    #[serde(default)]
    pub cache: Vec<CacheEntry>,
}

// ── Jobs ─────────────────────────────────────────────────────────────

/// A scheduled plugin job. Read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub plugin: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub last_run: Option<String>,
}

/// One item of `POST jobs/run`. Without a name every job of the plugin runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobItem {
    plugin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl JobItem {
    pub fn new(plugin: &str, name: Option<&str>) -> Result<Self, Error> {
        let plugin = plugin.trim();
        if plugin.is_empty() {
            return Err(Error::validation("job plugin must be provided"));
        }
        Ok(Self {
            plugin: plugin.to_owned(),
            name: non_blank(name).map(str::to_owned),
        })
    }
}

#[derive(Deserialize)]
pub(crate) struct JobsPayload {
    #[serde(default)]
    pub jobs: Vec<Job>,
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct LoginPayload {
    #[serde(default)]
    pub token: String,
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
