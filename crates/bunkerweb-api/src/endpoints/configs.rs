// Custom configuration endpoints
//
// Configs are addressed by `ConfigKey`, always rendered as
// `configs/{service}/{type}/{name}` with the global scope spelled `global`.

use reqwest::Method;
use serde::de::IgnoredAny;
use tracing::debug;

use crate::batch::{Batch, ConfigsDelete};
use crate::client::{BunkerWebClient, returned_or};
use crate::error::{Error, IdempotentDelete};
use crate::keys::ConfigKey;
use crate::models::{
    Config, ConfigCreateRequest, ConfigListOptions, ConfigPayload, ConfigUpdateRequest,
    ConfigsPayload,
};
use crate::multipart::{ConfigUpload, ConfigUploadUpdate};

impl BunkerWebClient {
    /// `POST configs`
    pub async fn create_config(&self, key: &ConfigKey, data: &str) -> Result<Config, Error> {
        debug!(%key, "creating config");
        let payload: Option<ConfigPayload> = self
            .send_json(
                Method::POST,
                &["configs"],
                &[],
                &ConfigCreateRequest { key, data },
            )
            .await?;
        Ok(returned_or(payload.and_then(|p| p.config), "config", || {
            Config::from_key(key, Some(data.to_owned()))
        }))
    }

    /// `GET configs` with optional filters.
    pub async fn list_configs(&self, options: &ConfigListOptions) -> Result<Vec<Config>, Error> {
        let payload: Option<ConfigsPayload> = self
            .send_empty(Method::GET, &["configs"], &options.query())
            .await?;
        Ok(payload.map(|p| p.configs).unwrap_or_default())
    }

    /// Read one config including its data.
    ///
    /// `GET configs/{service}/{type}/{name}?with_data=true`
    pub async fn get_config(&self, key: &ConfigKey) -> Result<Config, Error> {
        let payload: Option<ConfigPayload> = self
            .send_empty(Method::GET, &key.path(), &[("with_data", "true".to_owned())])
            .await?;
        Ok(returned_or(payload.and_then(|p| p.config), "config", || {
            Config::from_key(key, None)
        }))
    }

    /// Replace a config's data in place. The key itself never changes here;
    /// use [`patch_config`](Self::patch_config) or
    /// [`move_config`](Self::move_config) to relocate.
    pub async fn update_config(&self, key: &ConfigKey, data: &str) -> Result<Config, Error> {
        self.patch_config(key, &ConfigUpdateRequest::data(data)).await
    }

    /// Partially update a config. Any set key field moves it in the same
    /// call; the new key is validated before the request is sent.
    ///
    /// `PATCH configs/{service}/{type}/{name}`
    pub async fn patch_config(
        &self,
        key: &ConfigKey,
        request: &ConfigUpdateRequest,
    ) -> Result<Config, Error> {
        if request.is_empty() {
            return Err(Error::validation("at least one config field must be provided"));
        }
        let target = request.target(key)?;
        debug!(%key, %target, "updating config");
        let payload: Option<ConfigPayload> = self
            .send_json(Method::PATCH, &key.path(), &[], request)
            .await?;
        Ok(returned_or(payload.and_then(|p| p.config), "config", || {
            Config::from_key(&target, request.data.clone())
        }))
    }

    /// `DELETE configs/{service}/{type}/{name}`
    pub async fn delete_config(&self, key: &ConfigKey) -> Result<(), Error> {
        debug!(%key, "deleting config");
        let _: Option<IgnoredAny> = self.send_empty(Method::DELETE, &key.path(), &[]).await?;
        Ok(())
    }

    /// Delete several configs in one call. Needs at least one key.
    ///
    /// `DELETE configs` with `{"configs": [...]}`
    pub async fn delete_configs<I>(&self, keys: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = ConfigKey>,
    {
        let batch = Batch::new(keys, "config key")?;
        debug!(count = batch.len(), "deleting configs");
        let _: Option<IgnoredAny> = self
            .send_json(
                Method::DELETE,
                &["configs"],
                &[],
                &ConfigsDelete { configs: &batch },
            )
            .await?;
        Ok(())
    }

    /// Create one config per uploaded file.
    ///
    /// `POST configs/upload` (multipart)
    pub async fn upload_configs(&self, upload: &ConfigUpload) -> Result<Vec<Config>, Error> {
        let form = upload.encode()?;
        debug!(files = upload.files.len(), "uploading configs");
        let payload: Option<ConfigsPayload> = self
            .send_multipart(Method::POST, &["configs", "upload"], form)
            .await?;
        Ok(payload.map(|p| p.configs).unwrap_or_default())
    }

    /// Replace a config's content from a file, moving it when any `new_*`
    /// target is set.
    ///
    /// `PATCH configs/{service}/{type}/{name}/upload` (multipart)
    pub async fn update_config_from_upload(
        &self,
        key: &ConfigKey,
        update: &ConfigUploadUpdate,
    ) -> Result<Config, Error> {
        let target = update.target(key)?;
        let [root, service, config_type, name] = key.path();
        debug!(%key, %target, "updating config from upload");
        let payload: Option<ConfigPayload> = self
            .send_multipart(
                Method::PATCH,
                &[root, service, config_type, name, "upload"],
                update.encode(),
            )
            .await?;
        Ok(returned_or(payload.and_then(|p| p.config), "config", || {
            Config::from_key(
                &target,
                Some(String::from_utf8_lossy(update.file.content()).into_owned()),
            )
        }))
    }

    /// Give `from` the identity `to` with content `data`.
    ///
    /// Same key: a plain data update. Different key: delete the old config
    /// (already gone is fine) and create the new one.
    pub async fn move_config(
        &self,
        from: &ConfigKey,
        to: &ConfigKey,
        data: &str,
    ) -> Result<Config, Error> {
        if !from.relocates_to(to) {
            return self.update_config(to, data).await;
        }
        debug!(%from, %to, "moving config");
        self.delete_config(from).await.ignore_not_found()?;
        self.create_config(to, data).await
    }
}
