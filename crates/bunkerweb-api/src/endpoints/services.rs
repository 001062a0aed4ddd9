// Service endpoints

use reqwest::Method;
use serde::de::IgnoredAny;
use tracing::debug;

use crate::client::{BunkerWebClient, returned_or};
use crate::endpoints::identifier;
use crate::error::Error;
use crate::keys::service_identifier;
use crate::models::{
    ConvertTarget, Service, ServiceCreateRequest, ServicePayload, ServiceUpdateRequest,
    ServicesPayload,
};

impl BunkerWebClient {
    /// List services. Drafts are excluded unless `include_drafts` is set.
    ///
    /// `GET services[?with_drafts=false]`
    pub async fn list_services(&self, include_drafts: bool) -> Result<Vec<Service>, Error> {
        let query = if include_drafts {
            Vec::new()
        } else {
            vec![("with_drafts", "false".to_owned())]
        };
        let payload: Option<ServicesPayload> =
            self.send_empty(Method::GET, &["services"], &query).await?;
        Ok(payload.map(|p| p.services).unwrap_or_default())
    }

    /// `GET services/{id}`
    pub async fn get_service(&self, id: &str) -> Result<Service, Error> {
        let id = identifier(id, "service id")?;
        let payload: Option<ServicePayload> =
            self.send_empty(Method::GET, &["services", id], &[]).await?;
        Ok(returned_or(payload.and_then(|p| p.service), "service", || Service {
            id: id.to_owned(),
            ..Service::default()
        }))
    }

    /// `POST services`
    pub async fn create_service(&self, request: &ServiceCreateRequest) -> Result<Service, Error> {
        identifier(&request.server_name, "server_name")?;
        debug!(server_name = %request.server_name, "creating service");
        let payload: Option<ServicePayload> = self
            .send_json(Method::POST, &["services"], &[], request)
            .await?;
        Ok(returned_or(payload.and_then(|p| p.service), "service", || Service {
            id: service_identifier(&request.server_name),
            server_name: request.server_name.trim().to_owned(),
            is_draft: request.is_draft,
            variables: request.variables.clone(),
        }))
    }

    /// `PATCH services/{id}`
    pub async fn update_service(
        &self,
        id: &str,
        request: &ServiceUpdateRequest,
    ) -> Result<Service, Error> {
        let id = identifier(id, "service id")?;
        let payload: Option<ServicePayload> = self
            .send_json(Method::PATCH, &["services", id], &[], request)
            .await?;
        Ok(returned_or(payload.and_then(|p| p.service), "service", || Service {
            id: id.to_owned(),
            server_name: request.server_name.clone().unwrap_or_default(),
            is_draft: request.is_draft.unwrap_or_default(),
            variables: request.variables.clone().unwrap_or_default(),
        }))
    }

    /// `DELETE services/{id}`
    pub async fn delete_service(&self, id: &str) -> Result<(), Error> {
        let id = identifier(id, "service id")?;
        debug!(id, "deleting service");
        let _: Option<IgnoredAny> = self
            .send_empty(Method::DELETE, &["services", id], &[])
            .await?;
        Ok(())
    }

    /// Switch a service between online and draft.
    ///
    /// `POST services/{id}/convert?convert_to=online|draft`
    pub async fn convert_service(
        &self,
        id: &str,
        target: ConvertTarget,
    ) -> Result<Service, Error> {
        let id = identifier(id, "service id")?;
        debug!(id, %target, "converting service");
        let payload: Option<ServicePayload> = self
            .send_empty(
                Method::POST,
                &["services", id, "convert"],
                &[("convert_to", target.as_str().to_owned())],
            )
            .await?;
        Ok(returned_or(payload.and_then(|p| p.service), "service", || Service {
            id: id.to_owned(),
            is_draft: target == ConvertTarget::Draft,
            ..Service::default()
        }))
    }
}
