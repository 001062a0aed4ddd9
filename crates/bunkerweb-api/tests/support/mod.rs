// In-memory BunkerWeb control plane served through wiremock.
//
// One catch-all `Mock` routes every request to `FakeControlPlane`, which keeps
// state behind a mutex so scenario tests can run full CRUD lifecycles.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value, json};
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use bunkerweb_api::{BunkerWebClient, Credentials, service_identifier};

pub struct FakeControlPlane {
    state: Arc<Mutex<State>>,
}

pub struct Harness {
    pub server: MockServer,
    pub state: Arc<Mutex<State>>,
}

impl Harness {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let state = Arc::new(Mutex::new(State::seeded()));
        Mock::given(any())
            .respond_with(FakeControlPlane {
                state: Arc::clone(&state),
            })
            .mount(&server)
            .await;
        Self { server, state }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api", self.server.uri())
    }

    pub fn client(&self, credentials: Credentials) -> BunkerWebClient {
        BunkerWebClient::with_client(reqwest::Client::new(), &self.endpoint(), credentials)
            .unwrap()
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct StoredConfig {
    pub data: String,
    pub method: String,
}

#[derive(Debug, Clone)]
pub struct StoredBan {
    pub reason: String,
    pub exp: i64,
}

#[derive(Debug)]
pub struct State {
    pub global: Map<String, Value>,
    /// Keyed by (normalized service, type, name).
    pub configs: BTreeMap<(String, String, String), StoredConfig>,
    /// Keyed by (ip, service); unscoped bans use an empty service.
    pub bans: BTreeMap<(String, String), StoredBan>,
    pub services: BTreeMap<String, Value>,
    pub instances: BTreeMap<String, Value>,
    pub plugins: BTreeMap<String, Value>,
    pub job_runs: Vec<Value>,
    pub deleted_instance_batches: Vec<Vec<String>>,
    pub action_log: Vec<String>,
    pub last_authorization: Option<String>,
}

impl State {
    fn seeded() -> Self {
        let global = json!({"some_setting": "value", "feature_enabled": true, "retry_limit": 5});
        let mut plugins = BTreeMap::new();
        plugins.insert(
            "ui-dashboard".to_owned(),
            json!({"id": "ui-dashboard", "type": "ui", "version": "1.0.0", "description": "Dashboard"}),
        );
        Self {
            global: global.as_object().cloned().unwrap_or_default(),
            configs: BTreeMap::new(),
            bans: BTreeMap::new(),
            services: BTreeMap::new(),
            instances: BTreeMap::new(),
            plugins,
            job_runs: Vec::new(),
            deleted_instance_batches: Vec::new(),
            action_log: Vec::new(),
            last_authorization: None,
        }
    }
}

impl Respond for FakeControlPlane {
    fn respond(&self, req: &Request) -> ResponseTemplate {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let segments: Vec<String> = req
            .url
            .path_segments()
            .map(|s| s.map(str::to_owned).collect())
            .unwrap_or_default();
        let Some(("api", rest)) = segments.split_first().map(|(h, t)| (h.as_str(), t)) else {
            return fail(404, "unknown route");
        };
        let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
        route(&mut state, req, req.method.as_str(), &rest)
    }
}

// ── Routing ─────────────────────────────────────────────────────────

fn route(state: &mut State, req: &Request, method: &str, path: &[&str]) -> ResponseTemplate {
    match (method, path) {
        ("GET", ["ping"]) => ok(json!({"pong": true, "now": "2024-01-01T00:00:00Z"})),
        ("GET", ["health"]) => ok(json!({"status": "healthy", "uptime_seconds": 1234})),
        ("POST", ["auth"]) => login(state, req),

        ("GET", ["services"]) => list_services(state, req),
        ("POST", ["services"]) => create_service(state, req),
        ("POST", ["services", id, "convert"]) => convert_service(state, req, id),
        ("GET", ["services", id]) => match state.services.get(*id) {
            Some(svc) => ok(json!({"service": svc})),
            None => fail(404, "service not found"),
        },
        ("PATCH", ["services", id]) => update_service(state, req, id),
        ("DELETE", ["services", id]) => match state.services.remove(*id) {
            Some(_) => ok(json!({})),
            None => fail(404, "service not found"),
        },

        ("GET", ["instances"]) => {
            let all: Vec<&Value> = state.instances.values().collect();
            ok(json!({"instances": all}))
        }
        ("POST", ["instances"]) => create_instance(state, req),
        ("DELETE", ["instances"]) => delete_instances(state, req),
        ("GET", ["instances", "ping"]) => {
            state.action_log.push("ping:*".into());
            ok(json!({"pinged": state.instances.len()}))
        }
        ("POST", ["instances", "reload"]) => {
            let test = query(req, "test").unwrap_or_else(|| "true".into());
            state.action_log.push(format!("reload:*:test={test}"));
            ok(json!({"reloaded": "all", "test": test == "true"}))
        }
        ("POST", ["instances", "stop"]) => {
            state.action_log.push("stop:*".into());
            ok(json!({"stopped": "all"}))
        }
        ("GET", ["instances", host, "ping"]) => host_action(state, req, host, "ping"),
        ("POST", ["instances", host, action @ ("reload" | "stop")]) => {
            host_action(state, req, host, action)
        }
        ("GET", ["instances", host]) => match state.instances.get(*host) {
            Some(inst) => ok(json!({"instance": inst})),
            None => fail(404, "instance not found"),
        },
        ("PATCH", ["instances", host]) => update_instance(state, req, host),
        ("DELETE", ["instances", host]) => match state.instances.remove(*host) {
            Some(_) => ok(json!({})),
            None => fail(404, "instance not found"),
        },

        ("GET", ["global_config"]) => ok(Value::Object(state.global.clone())),
        ("PATCH", ["global_config"]) => patch_global(state, req),

        ("GET", ["configs"]) => list_configs(state, req),
        ("POST", ["configs"]) => create_config(state, req),
        ("DELETE", ["configs"]) => delete_configs(state, req),
        ("POST", ["configs", "upload"]) => upload_configs(state, req),
        ("PATCH", ["configs", service, config_type, name, "upload"]) => {
            upload_update_config(state, req, (*service, *config_type, *name))
        }
        ("GET", ["configs", service, config_type, name]) => {
            let key = config_key(service, config_type, name);
            match state.configs.get(&key) {
                Some(cfg) => ok(json!({"config": config_json(&key, cfg, with_data(req))})),
                None => fail(404, "config not found"),
            }
        }
        ("PATCH", ["configs", service, config_type, name]) => {
            patch_config(state, req, (*service, *config_type, *name))
        }
        ("DELETE", ["configs", service, config_type, name]) => {
            match state.configs.remove(&config_key(service, config_type, name)) {
                Some(_) => ok(json!({})),
                None => fail(404, "config not found"),
            }
        }

        ("GET", ["bans"]) => {
            let bans: Vec<Value> = state
                .bans
                .iter()
                .map(|((ip, service), ban)| {
                    let mut v = json!({"ip": ip, "reason": ban.reason, "exp": ban.exp});
                    if !service.is_empty() {
                        v["service"] = json!(service);
                    }
                    v
                })
                .collect();
            ok(json!({"bans": bans}))
        }
        ("POST", ["bans"] | ["bans", "ban"]) => create_bans(state, req),
        ("DELETE", ["bans"]) | ("POST", ["bans", "unban"]) => remove_bans(state, req),

        ("GET", ["plugins"]) => {
            let wanted = query(req, "type");
            let plugins: Vec<&Value> = state
                .plugins
                .values()
                .filter(|p| wanted.as_deref().is_none_or(|t| p["type"] == t))
                .collect();
            ok(json!({"plugins": plugins}))
        }
        ("POST", ["plugins", "upload"]) => upload_plugins(state, req),
        ("DELETE", ["plugins", id]) => match state.plugins.remove(*id) {
            Some(_) => ok(json!({})),
            None => fail(404, "plugin not found"),
        },

        ("GET", ["cache"]) => {
            let mut entry = json!({
                "service": "global", "plugin": "reporter",
                "job_name": "daily", "file_name": "summary.txt"
            });
            if with_data(req) {
                entry["data"] = json!("compressed content");
            }
            let matches = ["service", "plugin", "job_name"]
                .iter()
                .all(|f| query(req, f).is_none_or(|v| entry[*f] == v.as_str()));
            let cache = if matches { vec![entry] } else { Vec::new() };
            ok(json!({"cache": cache}))
        }
        ("GET", ["jobs"]) => ok(json!({"jobs": [{"plugin": "reporter", "name": "daily", "status": "idle"}]})),
        ("POST", ["jobs", "run"]) => {
            let body = json_body(req);
            let jobs = body["jobs"].as_array().cloned().unwrap_or_default();
            if jobs.is_empty() {
                return fail(400, "jobs required");
            }
            state.job_runs.extend(jobs);
            ok(json!({}))
        }

        _ => fail(404, "unknown route"),
    }
}

// ── Handlers ────────────────────────────────────────────────────────

fn login(state: &mut State, req: &Request) -> ResponseTemplate {
    let header = req
        .headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .map(|h| h.trim().to_owned());
    state.last_authorization.clone_from(&header);

    let Some(encoded) = header.as_deref().and_then(|h| h.strip_prefix("Basic ")) else {
        return fail(400, "basic auth required");
    };
    let Some(decoded) = STANDARD
        .decode(encoded)
        .ok()
        .and_then(|raw| String::from_utf8(raw).ok())
    else {
        return fail(400, "invalid basic auth header");
    };
    match decoded.split_once(':') {
        Some(("admin", "secret")) => ok(json!({"token": "token-admin"})),
        _ => fail(401, "invalid credentials"),
    }
}

fn list_services(state: &State, req: &Request) -> ResponseTemplate {
    let include_drafts = query(req, "with_drafts").is_none_or(|v| v != "false");
    let services: Vec<&Value> = state
        .services
        .values()
        .filter(|s| include_drafts || s["is_draft"] != true)
        .collect();
    ok(json!({"services": services}))
}

fn create_service(state: &mut State, req: &Request) -> ResponseTemplate {
    let body = json_body(req);
    let Some(server_name) = body["server_name"].as_str().filter(|s| !s.trim().is_empty()) else {
        return fail(400, "server_name required");
    };
    let id = service_identifier(server_name);
    let svc = json!({
        "id": id,
        "server_name": server_name,
        "is_draft": body["is_draft"].as_bool().unwrap_or(false),
        "variables": body.get("variables").cloned().unwrap_or_else(|| json!({})),
    });
    state.services.insert(id, svc.clone());
    ok(json!({"service": svc}))
}

fn update_service(state: &mut State, req: &Request, id: &str) -> ResponseTemplate {
    let body = json_body(req);
    let Some(svc) = state.services.get_mut(id) else {
        return fail(404, "service not found");
    };
    for field in ["server_name", "is_draft", "variables"] {
        if let Some(v) = body.get(field) {
            svc[field] = v.clone();
        }
    }
    ok(json!({"service": svc}))
}

fn convert_service(state: &mut State, req: &Request, id: &str) -> ResponseTemplate {
    let target = query(req, "convert_to").unwrap_or_default();
    let is_draft = match target.as_str() {
        "online" => false,
        "draft" => true,
        _ => return fail(400, "convert_to must be 'online' or 'draft'"),
    };
    let Some(svc) = state.services.get_mut(id) else {
        return fail(404, "service not found");
    };
    svc["is_draft"] = json!(is_draft);
    ok(json!({"service": svc}))
}

fn create_instance(state: &mut State, req: &Request) -> ResponseTemplate {
    let mut body = json_body(req);
    let Some(hostname) = body["hostname"].as_str().map(str::to_owned) else {
        return fail(400, "hostname required");
    };
    if body.get("method").is_none() {
        body["method"] = json!("api");
    }
    state.instances.insert(hostname, body.clone());
    ok(json!({"instance": body}))
}

fn update_instance(state: &mut State, req: &Request, host: &str) -> ResponseTemplate {
    let body = json_body(req);
    let Some(inst) = state.instances.get_mut(host) else {
        return fail(404, "instance not found");
    };
    if let (Some(target), Some(patch)) = (inst.as_object_mut(), body.as_object()) {
        for (k, v) in patch {
            target.insert(k.clone(), v.clone());
        }
    }
    ok(json!({"instance": inst}))
}

fn delete_instances(state: &mut State, req: &Request) -> ResponseTemplate {
    let body = json_body(req);
    let hosts: Vec<String> = body["instances"]
        .as_array()
        .map(|a| a.iter().filter_map(|h| h.as_str().map(str::to_owned)).collect())
        .unwrap_or_default();
    if hosts.is_empty() {
        return fail(400, "instances required");
    }
    for host in &hosts {
        state.instances.remove(host);
    }
    state.deleted_instance_batches.push(hosts);
    ok(json!({}))
}

fn host_action(state: &mut State, req: &Request, host: &str, action: &str) -> ResponseTemplate {
    if !state.instances.contains_key(host) {
        return fail(404, "instance not found");
    }
    let mut entry = format!("{action}:{host}");
    if action == "reload" {
        let test = query(req, "test").unwrap_or_else(|| "true".into());
        entry.push_str(&format!(":test={test}"));
    }
    state.action_log.push(entry);
    ok(json!({"hostname": host, "action": action}))
}

fn patch_global(state: &mut State, req: &Request) -> ResponseTemplate {
    let body = json_body(req);
    let Some(patch) = body.as_object().filter(|m| !m.is_empty()) else {
        return fail(400, "no settings provided");
    };
    for (key, value) in patch {
        if value.is_null() {
            state.global.remove(key);
        } else {
            state.global.insert(key.clone(), value.clone());
        }
    }
    ok(Value::Object(state.global.clone()))
}

fn list_configs(state: &State, req: &Request) -> ResponseTemplate {
    let service = query(req, "service").map(|s| normalize_service(&s));
    let config_type = query(req, "type");
    let data = with_data(req);
    let configs: Vec<Value> = state
        .configs
        .iter()
        .filter(|((s, t, _), _)| {
            service.as_deref().is_none_or(|f| f == s)
                && config_type.as_deref().is_none_or(|f| f == t)
        })
        .map(|(key, cfg)| config_json(key, cfg, data))
        .collect();
    ok(json!({"configs": configs}))
}

fn create_config(state: &mut State, req: &Request) -> ResponseTemplate {
    let body = json_body(req);
    let (Some(config_type), Some(name)) = (body["type"].as_str(), body["name"].as_str()) else {
        return fail(400, "type and name required");
    };
    let key = config_key(
        body["service"].as_str().unwrap_or_default(),
        config_type,
        name,
    );
    let cfg = StoredConfig {
        data: body["data"].as_str().unwrap_or_default().to_owned(),
        method: "api".into(),
    };
    let out = config_json(&key, &cfg, true);
    state.configs.insert(key, cfg);
    ok(json!({"config": out}))
}

fn delete_configs(state: &mut State, req: &Request) -> ResponseTemplate {
    let body = json_body(req);
    let keys = body["configs"].as_array().cloned().unwrap_or_default();
    if keys.is_empty() {
        return fail(400, "configs required");
    }
    for k in keys {
        let key = config_key(
            k["service"].as_str().unwrap_or_default(),
            k["type"].as_str().unwrap_or_default(),
            k["name"].as_str().unwrap_or_default(),
        );
        state.configs.remove(&key);
    }
    ok(json!({}))
}

fn upload_configs(state: &mut State, req: &Request) -> ResponseTemplate {
    let parts = parse_multipart(req);
    let Some(config_type) = field(&parts, "type").filter(|t| !t.is_empty()) else {
        return fail(400, "type field required");
    };
    let service = field(&parts, "service").unwrap_or_default();
    let files: Vec<&Part> = parts.iter().filter(|p| p.name == "files").collect();
    if files.is_empty() {
        return fail(400, "missing files part");
    }

    let mut created = Vec::new();
    for file in files {
        let key = config_key(&service, &config_type, file.filename.as_deref().unwrap_or("config"));
        let cfg = StoredConfig {
            data: file.content.clone(),
            method: "api".into(),
        };
        created.push(config_json(&key, &cfg, true));
        state.configs.insert(key, cfg);
    }
    ok(json!({"configs": created}))
}

fn patch_config(
    state: &mut State,
    req: &Request,
    (service, config_type, name): (&str, &str, &str),
) -> ResponseTemplate {
    let old = config_key(service, config_type, name);
    let body = json_body(req);
    let Some(mut cfg) = state.configs.remove(&old) else {
        return fail(404, "config not found");
    };
    let text = |field: &str, current: &String| {
        body.get(field)
            .and_then(Value::as_str)
            .map_or_else(|| current.clone(), str::to_owned)
    };
    let new = config_key(&text("service", &old.0), &text("type", &old.1), &text("name", &old.2));
    if let Some(data) = body.get("data").and_then(Value::as_str) {
        data.clone_into(&mut cfg.data);
    }
    let out = config_json(&new, &cfg, true);
    state.configs.insert(new, cfg);
    ok(json!({"config": out}))
}

fn upload_update_config(
    state: &mut State,
    req: &Request,
    (service, config_type, name): (&str, &str, &str),
) -> ResponseTemplate {
    let parts = parse_multipart(req);
    let Some(file) = parts.iter().find(|p| p.name == "file") else {
        return fail(400, "missing file part");
    };
    let old = config_key(service, config_type, name);
    let new = config_key(
        &field(&parts, "new_service").unwrap_or_else(|| old.0.clone()),
        &field(&parts, "new_type").unwrap_or_else(|| old.1.clone()),
        &field(&parts, "new_name").unwrap_or_else(|| old.2.clone()),
    );

    let mut cfg = state.configs.remove(&old).unwrap_or(StoredConfig {
        data: String::new(),
        method: "api".into(),
    });
    file.content.clone_into(&mut cfg.data);
    let out = config_json(&new, &cfg, true);
    state.configs.insert(new, cfg);
    ok(json!({"config": out}))
}

fn create_bans(state: &mut State, req: &Request) -> ResponseTemplate {
    let body = json_body(req);
    let Some(items) = body.as_array().filter(|a| !a.is_empty()) else {
        return fail(400, "at least one ban is required");
    };
    for item in items {
        let Some(ip) = item["ip"].as_str() else {
            return fail(400, "ip required");
        };
        state.bans.insert(
            (ip.to_owned(), ban_service(item)),
            StoredBan {
                reason: item["reason"].as_str().unwrap_or("api").to_owned(),
                exp: item["exp"].as_i64().unwrap_or(0),
            },
        );
    }
    ok(json!({}))
}

fn remove_bans(state: &mut State, req: &Request) -> ResponseTemplate {
    let body = json_body(req);
    let Some(items) = body.as_array().filter(|a| !a.is_empty()) else {
        return fail(400, "at least one unban is required");
    };
    for item in items {
        if let Some(ip) = item["ip"].as_str() {
            state.bans.remove(&(ip.to_owned(), ban_service(item)));
        }
    }
    ok(json!({}))
}

fn upload_plugins(state: &mut State, req: &Request) -> ResponseTemplate {
    let parts = parse_multipart(req);
    let method = field(&parts, "method").unwrap_or_else(|| "ui".into());
    let mut created = Vec::new();
    for file in parts.iter().filter(|p| p.name == "files") {
        let filename = file.filename.clone().unwrap_or_default();
        let id = filename
            .rsplit_once('.')
            .map_or(filename.as_str(), |(stem, _)| stem)
            .to_owned();
        let plugin = json!({
            "id": id,
            "type": method,
            "version": "uploaded",
            "description": format!("uploaded from {filename}"),
        });
        state.plugins.insert(id, plugin.clone());
        created.push(plugin);
    }
    if created.is_empty() {
        return fail(400, "missing files part");
    }
    ok(json!({"plugins": created}))
}

// ── Helpers ─────────────────────────────────────────────────────────

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"status": "success", "data": data}))
}

fn fail(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({"status": "error", "message": message}))
}

fn json_body(req: &Request) -> Value {
    serde_json::from_slice(&req.body).unwrap_or(Value::Null)
}

fn query(req: &Request, name: &str) -> Option<String> {
    req.url
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn with_data(req: &Request) -> bool {
    query(req, "with_data").as_deref() == Some("true")
}

fn normalize_service(service: &str) -> String {
    let trimmed = service.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("global") {
        "global".into()
    } else {
        trimmed.to_owned()
    }
}

fn config_key(service: &str, config_type: &str, name: &str) -> (String, String, String) {
    (
        normalize_service(service),
        config_type.trim().to_owned(),
        name.trim().to_owned(),
    )
}

fn config_json(key: &(String, String, String), cfg: &StoredConfig, data: bool) -> Value {
    let mut v = json!({
        "service": key.0, "type": key.1, "name": key.2, "method": cfg.method
    });
    if data {
        v["data"] = json!(cfg.data);
    }
    v
}

fn ban_service(item: &Value) -> String {
    item["service"]
        .as_str()
        .map(str::trim)
        .unwrap_or_default()
        .to_owned()
}

// ── Multipart ───────────────────────────────────────────────────────

pub struct Part {
    pub name: String,
    pub filename: Option<String>,
    pub content: String,
}

fn field(parts: &[Part], name: &str) -> Option<String> {
    parts
        .iter()
        .find(|p| p.name == name && p.filename.is_none())
        .map(|p| p.content.trim().to_owned())
}

/// Minimal multipart/form-data reader for text payloads.
pub fn parse_multipart(req: &Request) -> Vec<Part> {
    let Some(boundary) = req
        .headers
        .get("content-type")
        .and_then(|h| h.to_str().ok())
        .and_then(|ct| ct.split_once("boundary="))
        .map(|(_, b)| b.to_owned())
    else {
        return Vec::new();
    };
    let body = String::from_utf8_lossy(&req.body).into_owned();
    let delimiter = format!("--{boundary}");

    body.split(delimiter.as_str())
        .skip(1)
        .take_while(|chunk| !chunk.starts_with("--"))
        .filter_map(|chunk| {
            let chunk = chunk.strip_prefix("\r\n")?;
            let (headers, content) = chunk.split_once("\r\n\r\n")?;
            let content = content.strip_suffix("\r\n").unwrap_or(content);
            let disposition = headers
                .lines()
                .find(|l| l.to_ascii_lowercase().starts_with("content-disposition"))?;
            Some(Part {
                name: quoted_param(disposition, "name")?,
                filename: quoted_param(disposition, "filename"),
                content: content.to_owned(),
            })
        })
        .collect()
}

fn quoted_param(header: &str, param: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|kv| {
        let value = kv.strip_prefix(param)?.strip_prefix("=\"")?;
        value.strip_suffix('"').map(str::to_owned)
    })
}
