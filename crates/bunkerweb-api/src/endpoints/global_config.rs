// Global configuration endpoints
//
// The global config is one flat settings map. Reads return the whole map;
// writes are partial maps merged shallowly, with `null` resetting a key.

use reqwest::Method;
use serde_json::{Map, Value};
use tracing::debug;

use crate::client::BunkerWebClient;
use crate::error::Error;
use crate::models::GlobalConfigSetting;

impl BunkerWebClient {
    /// Read the settings map.
    ///
    /// `GET global_config[?full=true][&methods=true]`
    pub async fn get_global_config(
        &self,
        full: bool,
        methods: bool,
    ) -> Result<Map<String, Value>, Error> {
        let mut query = Vec::new();
        if full {
            query.push(("full", "true".to_owned()));
        }
        if methods {
            query.push(("methods", "true".to_owned()));
        }
        let payload: Option<Map<String, Value>> =
            self.send_empty(Method::GET, &["global_config"], &query).await?;
        Ok(payload.unwrap_or_default())
    }

    /// Merge `settings` into the global config and return the resulting map.
    ///
    /// `PATCH global_config`
    pub async fn update_global_config(
        &self,
        settings: &Map<String, Value>,
    ) -> Result<Map<String, Value>, Error> {
        if settings.is_empty() {
            return Err(Error::validation("at least one setting must be provided"));
        }
        debug!(keys = settings.len(), "patching global config");
        let payload: Option<Map<String, Value>> = self
            .send_json(Method::PATCH, &["global_config"], &[], settings)
            .await?;
        Ok(payload.unwrap_or_default())
    }

    /// Read one key. `None` when the key is unset.
    pub async fn get_global_setting(
        &self,
        key: &str,
    ) -> Result<Option<GlobalConfigSetting>, Error> {
        let settings = self.get_global_config(false, false).await?;
        Ok(GlobalConfigSetting::from_settings(key, &settings))
    }

    /// Set one key.
    pub async fn set_global_setting(
        &self,
        setting: &GlobalConfigSetting,
    ) -> Result<Map<String, Value>, Error> {
        self.update_global_config(&setting.patch()).await
    }

    /// Reset one key to the control plane's default.
    pub async fn reset_global_setting(&self, key: &str) -> Result<Map<String, Value>, Error> {
        self.update_global_config(&GlobalConfigSetting::reset(key)?)
            .await
    }
}
