// Plugin endpoints

use reqwest::Method;
use serde::de::IgnoredAny;
use tracing::debug;

use crate::client::BunkerWebClient;
use crate::endpoints::identifier;
use crate::error::Error;
use crate::models::{Plugin, PluginsPayload, non_blank};
use crate::multipart::PluginUpload;

impl BunkerWebClient {
    /// List plugins, optionally filtered by type (`core`, `external`, `ui`, ...).
    ///
    /// `GET plugins[?type=...][&with_data=true]`
    pub async fn list_plugins(
        &self,
        plugin_type: Option<&str>,
        with_data: bool,
    ) -> Result<Vec<Plugin>, Error> {
        let mut query = Vec::new();
        if let Some(plugin_type) = non_blank(plugin_type) {
            query.push(("type", plugin_type.to_owned()));
        }
        if with_data {
            query.push(("with_data", "true".to_owned()));
        }
        let payload: Option<PluginsPayload> =
            self.send_empty(Method::GET, &["plugins"], &query).await?;
        Ok(payload.map(|p| p.plugins).unwrap_or_default())
    }

    /// Install plugin packages. Returns the plugins the control plane created.
    ///
    /// `POST plugins/upload` (multipart)
    pub async fn upload_plugins(&self, upload: &PluginUpload) -> Result<Vec<Plugin>, Error> {
        let form = upload.encode()?;
        debug!(files = upload.files.len(), "uploading plugins");
        let payload: Option<PluginsPayload> = self
            .send_multipart(Method::POST, &["plugins", "upload"], form)
            .await?;
        Ok(payload.map(|p| p.plugins).unwrap_or_default())
    }

    /// `DELETE plugins/{id}`
    pub async fn delete_plugin(&self, id: &str) -> Result<(), Error> {
        let id = identifier(id, "plugin id")?;
        debug!(id, "deleting plugin");
        let _: Option<IgnoredAny> = self
            .send_empty(Method::DELETE, &["plugins", id], &[])
            .await?;
        Ok(())
    }
}
