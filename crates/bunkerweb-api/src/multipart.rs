// multipart/form-data encoding for upload endpoints
//
// Bodies are built fully in memory: uploads are small configuration files
// and plugin archives, and a buffered body keeps requests replayable.

use uuid::Uuid;

use crate::error::Error;
use crate::keys::ConfigKey;
use crate::models::non_blank;

/// A finished multipart body and its matching `Content-Type` header value.
#[derive(Debug, Clone)]
pub(crate) struct MultipartBody {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Incremental form builder. Parts are written in call order.
pub(crate) struct MultipartBuilder {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub(crate) fn new() -> Self {
        Self {
            boundary: format!("bunkerweb-{}", Uuid::new_v4().simple()),
            body: Vec::new(),
        }
    }

    /// Append a plain text field.
    pub(crate) fn text(mut self, name: &str, value: &str) -> Self {
        self.open_part();
        self.push_str(&format!(
            "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
            escape_quoted(name)
        ));
        self.push_str(value);
        self.push_str("\r\n");
        self
    }

    /// Append a file part under `field`.
    pub(crate) fn file(mut self, field: &str, file: &UploadFile) -> Self {
        self.open_part();
        self.push_str(&format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            escape_quoted(field),
            escape_quoted(&file.file_name)
        ));
        self.push_str("Content-Type: application/octet-stream\r\n\r\n");
        self.body.extend_from_slice(&file.content);
        self.push_str("\r\n");
        self
    }

    pub(crate) fn finish(mut self) -> MultipartBody {
        let closing = format!("--{}--\r\n", self.boundary);
        self.push_str(&closing);
        MultipartBody {
            content_type: format!("multipart/form-data; boundary={}", self.boundary),
            body: self.body,
        }
    }

    fn open_part(&mut self) {
        let delimiter = format!("--{}\r\n", self.boundary);
        self.push_str(&delimiter);
    }

    fn push_str(&mut self, s: &str) {
        self.body.extend_from_slice(s.as_bytes());
    }
}

fn escape_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\r' | '\n' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

// ── Upload shapes ────────────────────────────────────────────────────

/// A named file to upload. The name becomes the resource name server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    file_name: String,
    content: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: &str, content: impl Into<Vec<u8>>) -> Result<Self, Error> {
        let file_name = file_name.trim();
        if file_name.is_empty() {
            return Err(Error::validation("file name must be provided"));
        }
        Ok(Self {
            file_name: file_name.to_owned(),
            content: content.into(),
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

/// `POST configs/upload`: one config per file, all sharing a service and type.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpload {
    pub service: Option<String>,
    pub config_type: String,
    pub files: Vec<UploadFile>,
}

impl ConfigUpload {
    pub(crate) fn encode(&self) -> Result<MultipartBody, Error> {
        let config_type = self.config_type.trim();
        if config_type.is_empty() {
            return Err(Error::validation("config type must be provided"));
        }
        require_files(&self.files)?;

        let mut form = MultipartBuilder::new();
        if let Some(service) = non_blank(self.service.as_deref()) {
            form = form.text("service", service);
        }
        form = form.text("type", config_type);
        for file in &self.files {
            form = form.file("files", file);
        }
        Ok(form.finish())
    }
}

/// `PATCH configs/{service}/{type}/{name}/upload`: replace a config's content
/// from a file, optionally moving it to a new key in the same call.
#[derive(Debug, Clone)]
pub struct ConfigUploadUpdate {
    pub file: UploadFile,
    pub new_service: Option<String>,
    pub new_type: Option<String>,
    pub new_name: Option<String>,
}

impl ConfigUploadUpdate {
    pub fn new(file: UploadFile) -> Self {
        Self {
            file,
            new_service: None,
            new_type: None,
            new_name: None,
        }
    }

    /// Key the config has once the update is applied to `current`.
    pub fn target(&self, current: &ConfigKey) -> Result<ConfigKey, Error> {
        current.relocated(
            self.new_service.as_deref(),
            self.new_type.as_deref(),
            self.new_name.as_deref(),
        )
    }

    /// Every set target is sent trimmed; an empty `new_service` moves the
    /// config to the global scope.
    pub(crate) fn encode(&self) -> MultipartBody {
        let mut form = MultipartBuilder::new().file("file", &self.file);
        for (name, value) in [
            ("new_service", &self.new_service),
            ("new_type", &self.new_type),
            ("new_name", &self.new_name),
        ] {
            if let Some(v) = value {
                form = form.text(name, v.trim());
            }
        }
        form.finish()
    }
}

/// `POST plugins/upload`.
#[derive(Debug, Clone, Default)]
pub struct PluginUpload {
    /// Install method recorded by the control plane (e.g. `"ui"`).
    pub method: Option<String>,
    pub files: Vec<UploadFile>,
}

impl PluginUpload {
    pub(crate) fn encode(&self) -> Result<MultipartBody, Error> {
        require_files(&self.files)?;

        let mut form = MultipartBuilder::new();
        if let Some(method) = non_blank(self.method.as_deref()) {
            form = form.text("method", method);
        }
        for file in &self.files {
            form = form.file("files", file);
        }
        Ok(form.finish())
    }
}

fn require_files(files: &[UploadFile]) -> Result<(), Error> {
    if files.is_empty() {
        return Err(Error::validation("at least one file is required"));
    }
    Ok(())
}
