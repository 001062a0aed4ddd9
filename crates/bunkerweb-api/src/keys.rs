// ── Composite resource identity ──
//
// Configs and bans have no surrogate id: their key IS their identity.
// Each key is its own type so the scope rules (configs fall back to
// `global`, bans never do) live in the type instead of in call sites.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

const GLOBAL: &str = "global";

/// URL path handling resolves `.` and `..` away, so neither can name a
/// resource.
pub(crate) fn check_segment(value: &str, what: &str) -> Result<(), Error> {
    if matches!(value, "." | "..") {
        return Err(Error::validation(format!("{what} cannot be {value:?}")));
    }
    Ok(())
}

// ── Config scope ────────────────────────────────────────────────────

/// Service segment of a config key.
///
/// Absent, blank, and any casing of `"global"` all collapse to [`Global`](Self::Global).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ConfigScope {
    #[default]
    Global,
    Service(String),
}

impl ConfigScope {
    pub fn new(service: Option<&str>) -> Self {
        match service.map(str::trim) {
            None | Some("") => Self::Global,
            Some(s) if s.eq_ignore_ascii_case(GLOBAL) => Self::Global,
            Some(s) => Self::Service(s.to_owned()),
        }
    }

    /// Path segment: always present, `global` for the default scope.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Global => GLOBAL,
            Self::Service(s) => s,
        }
    }

    /// Wire form: `None` for the default scope, which JSON bodies omit.
    pub fn service(&self) -> Option<&str> {
        match self {
            Self::Global => None,
            Self::Service(s) => Some(s),
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── ConfigKey ───────────────────────────────────────────────────────

/// Identity of a custom configuration snippet: `(scope, type, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "ConfigKeyRepr", try_from = "ConfigKeyRepr")]
pub struct ConfigKey {
    scope: ConfigScope,
    config_type: String,
    name: String,
}

#[derive(Serialize, Deserialize)]
struct ConfigKeyRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    service: Option<String>,
    #[serde(rename = "type")]
    config_type: String,
    name: String,
}

impl From<ConfigKey> for ConfigKeyRepr {
    fn from(key: ConfigKey) -> Self {
        Self {
            service: key.scope.service().map(str::to_owned),
            config_type: key.config_type,
            name: key.name,
        }
    }
}

impl TryFrom<ConfigKeyRepr> for ConfigKey {
    type Error = Error;

    fn try_from(repr: ConfigKeyRepr) -> Result<Self, Error> {
        Self::new(repr.service.as_deref(), &repr.config_type, &repr.name)
    }
}

impl ConfigKey {
    /// Build a key. `type` and `name` must be non-blank.
    pub fn new(service: Option<&str>, config_type: &str, name: &str) -> Result<Self, Error> {
        let config_type = config_type.trim();
        let name = name.trim();
        if config_type.is_empty() {
            return Err(Error::validation("config type must be provided"));
        }
        if name.is_empty() {
            return Err(Error::validation("config name must be provided"));
        }
        let scope = ConfigScope::new(service);
        check_segment(scope.as_str(), "config service")?;
        check_segment(config_type, "config type")?;
        check_segment(name, "config name")?;
        Ok(Self {
            scope,
            config_type: config_type.to_owned(),
            name: name.to_owned(),
        })
    }

    /// This key with any of its segments replaced. A blank service moves
    /// the config to the global scope.
    pub fn relocated(
        &self,
        service: Option<&str>,
        config_type: Option<&str>,
        name: Option<&str>,
    ) -> Result<Self, Error> {
        Self::new(
            Some(service.unwrap_or(self.scope.as_str())),
            config_type.unwrap_or(&self.config_type),
            name.unwrap_or(&self.name),
        )
    }

    pub fn scope(&self) -> &ConfigScope {
        &self.scope
    }

    pub fn config_type(&self) -> &str {
        &self.config_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// URL path segments: `configs/{service}/{type}/{name}`.
    pub(crate) fn path(&self) -> [&str; 4] {
        ["configs", self.scope.as_str(), &self.config_type, &self.name]
    }

    /// `true` when moving from `self` to `other` would change identity
    /// (and therefore requires delete + create rather than an update).
    pub fn relocates_to(&self, other: &ConfigKey) -> bool {
        self != other
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.scope, self.config_type, self.name)
    }
}

/// Parses the import identifier `service/type/name`.
impl FromStr for ConfigKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        let [service, config_type, name] = parts.as_slice() else {
            return Err(Error::validation(format!(
                "expected identifier in the form service/type/name, got {s:?}"
            )));
        };
        Self::new(Some(*service), config_type, name)
    }
}

// ── Ban scope ───────────────────────────────────────────────────────

/// Service segment of a ban key. Unlike configs there is no fallback:
/// an unscoped ban and a ban on any named service are different bans.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum BanScope {
    #[default]
    Unscoped,
    Service(String),
}

impl BanScope {
    pub fn new(service: Option<&str>) -> Self {
        match service.map(str::trim) {
            None | Some("") => Self::Unscoped,
            Some(s) => Self::Service(s.to_owned()),
        }
    }

    pub fn service(&self) -> Option<&str> {
        match self {
            Self::Unscoped => None,
            Self::Service(s) => Some(s),
        }
    }
}

// ── BanKey ──────────────────────────────────────────────────────────

/// Identity of an IP ban: `(ip, scope)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BanKey {
    ip: String,
    scope: BanScope,
}

impl BanKey {
    pub fn new(ip: &str, service: Option<&str>) -> Result<Self, Error> {
        let ip = ip.trim();
        if ip.is_empty() {
            return Err(Error::validation("ip must be provided"));
        }
        check_segment(ip, "ip")?;
        let scope = BanScope::new(service);
        if let Some(service) = scope.service() {
            check_segment(service, "ban service")?;
        }
        Ok(Self {
            ip: ip.to_owned(),
            scope,
        })
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn scope(&self) -> &BanScope {
        &self.scope
    }

    /// Does this key address the given ban?
    pub fn matches(&self, ip: &str, service: Option<&str>) -> bool {
        self.ip == ip.trim() && self.scope == BanScope::new(service)
    }
}

impl fmt::Display for BanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            BanScope::Unscoped => f.write_str(&self.ip),
            BanScope::Service(s) => write!(f, "{}/{s}", self.ip),
        }
    }
}

/// Parses the import identifier `ip` or `ip/service`.
impl FromStr for BanKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split('/').collect::<Vec<_>>().as_slice() {
            [ip] => Self::new(ip, None),
            [ip, service] => Self::new(ip, Some(*service)),
            _ => Err(Error::validation(format!(
                "expected ip or ip/service, got {s:?}"
            ))),
        }
    }
}

// ── Service identifier ──────────────────────────────────────────────

/// Derive the identifier the control plane assigns to a service from its
/// server name: first word, lowercased, restricted to `[a-z0-9.-]`.
pub fn service_identifier(server_name: &str) -> String {
    let first = server_name.split_whitespace().next().unwrap_or_default();
    let id: String = first
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            'a'..='z' | '0'..='9' | '.' | '-' => Some(c),
            '_' => Some('-'),
            _ => None,
        })
        .collect();

    if id.is_empty() { "service".into() } else { id }
}
