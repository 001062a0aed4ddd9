// Instance endpoints
//
// CRUD plus the raw per-host and fleet-wide actions. Fan-out across several
// hosts lives in `crate::actions`.

use reqwest::Method;
use serde::de::IgnoredAny;
use serde_json::{Map, Value};
use tracing::debug;

use crate::batch::{InstancesDelete, hostnames};
use crate::client::{BunkerWebClient, returned_or};
use crate::endpoints::identifier;
use crate::error::Error;
use crate::models::{
    Instance, InstanceCreateRequest, InstancePayload, InstanceUpdateRequest, InstancesPayload,
};

impl BunkerWebClient {
    /// `GET instances`
    pub async fn list_instances(&self) -> Result<Vec<Instance>, Error> {
        let payload: Option<InstancesPayload> =
            self.send_empty(Method::GET, &["instances"], &[]).await?;
        Ok(payload.map(|p| p.instances).unwrap_or_default())
    }

    /// `GET instances/{hostname}`
    pub async fn get_instance(&self, hostname: &str) -> Result<Instance, Error> {
        let hostname = identifier(hostname, "instance hostname")?;
        let payload: Option<InstancePayload> = self
            .send_empty(Method::GET, &["instances", hostname], &[])
            .await?;
        Ok(returned_or(payload.and_then(|p| p.instance), "instance", || {
            Instance::new(hostname)
        }))
    }

    /// `POST instances`
    pub async fn create_instance(
        &self,
        request: &InstanceCreateRequest,
    ) -> Result<Instance, Error> {
        identifier(&request.hostname, "instance hostname")?;
        debug!(hostname = %request.hostname, "creating instance");
        let payload: Option<InstancePayload> = self
            .send_json(Method::POST, &["instances"], &[], request)
            .await?;
        Ok(returned_or(payload.and_then(|p| p.instance), "instance", || {
            Instance::from(request)
        }))
    }

    /// `PATCH instances/{hostname}`
    pub async fn update_instance(
        &self,
        hostname: &str,
        request: &InstanceUpdateRequest,
    ) -> Result<Instance, Error> {
        let hostname = identifier(hostname, "instance hostname")?;
        let payload: Option<InstancePayload> = self
            .send_json(Method::PATCH, &["instances", hostname], &[], request)
            .await?;
        Ok(returned_or(payload.and_then(|p| p.instance), "instance", || {
            request.applied_to(hostname)
        }))
    }

    /// `DELETE instances/{hostname}`
    pub async fn delete_instance(&self, hostname: &str) -> Result<(), Error> {
        let hostname = identifier(hostname, "instance hostname")?;
        debug!(hostname, "deleting instance");
        let _: Option<IgnoredAny> = self
            .send_empty(Method::DELETE, &["instances", hostname], &[])
            .await?;
        Ok(())
    }

    /// Delete several instances in one call. Needs at least one hostname.
    ///
    /// `DELETE instances` with `{"instances": [...]}`
    pub async fn delete_instances<I, S>(&self, hosts: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let batch = hostnames(hosts)?;
        debug!(count = batch.len(), "deleting instances");
        let _: Option<IgnoredAny> = self
            .send_json(
                Method::DELETE,
                &["instances"],
                &[],
                &InstancesDelete { instances: &batch },
            )
            .await?;
        Ok(())
    }

    // ── Actions ──────────────────────────────────────────────────────

    /// `GET instances/ping`
    pub async fn ping_instances(&self) -> Result<Map<String, Value>, Error> {
        self.instance_action(Method::GET, &["instances", "ping"], &[])
            .await
    }

    /// `GET instances/{hostname}/ping`
    pub async fn ping_instance(&self, hostname: &str) -> Result<Map<String, Value>, Error> {
        let hostname = identifier(hostname, "instance hostname")?;
        self.instance_action(Method::GET, &["instances", hostname, "ping"], &[])
            .await
    }

    /// `POST instances/reload[?test=bool]`. Without `test` the control plane
    /// runs a configuration test first.
    pub async fn reload_instances(&self, test: Option<bool>) -> Result<Map<String, Value>, Error> {
        self.instance_action(Method::POST, &["instances", "reload"], &test_query(test))
            .await
    }

    /// `POST instances/{hostname}/reload[?test=bool]`
    pub async fn reload_instance(
        &self,
        hostname: &str,
        test: Option<bool>,
    ) -> Result<Map<String, Value>, Error> {
        let hostname = identifier(hostname, "instance hostname")?;
        self.instance_action(
            Method::POST,
            &["instances", hostname, "reload"],
            &test_query(test),
        )
        .await
    }

    /// `POST instances/stop`
    pub async fn stop_instances(&self) -> Result<Map<String, Value>, Error> {
        self.instance_action(Method::POST, &["instances", "stop"], &[])
            .await
    }

    /// `POST instances/{hostname}/stop`
    pub async fn stop_instance(&self, hostname: &str) -> Result<Map<String, Value>, Error> {
        let hostname = identifier(hostname, "instance hostname")?;
        self.instance_action(Method::POST, &["instances", hostname, "stop"], &[])
            .await
    }

    async fn instance_action(
        &self,
        method: Method,
        path: &[&str],
        query: &[(&'static str, String)],
    ) -> Result<Map<String, Value>, Error> {
        let payload: Option<Map<String, Value>> = self.send_empty(method, path, query).await?;
        Ok(payload.unwrap_or_default())
    }
}

fn test_query(test: Option<bool>) -> Vec<(&'static str, String)> {
    test.map(|t| vec![("test", t.to_string())]).unwrap_or_default()
}
