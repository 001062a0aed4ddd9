// Ban endpoints
//
// Single and bulk operations share one wire shape: a bare JSON array of
// per-ban objects. A ban is unique per (ip, service); re-banning overwrites.

use reqwest::Method;
use serde::Serialize;
use serde::de::IgnoredAny;
use tracing::debug;

use crate::batch::Batch;
use crate::client::BunkerWebClient;
use crate::error::Error;
use crate::keys::BanKey;
use crate::models::{Ban, BanRequest, BansPayload, UnbanRequest};

impl BunkerWebClient {
    /// `GET bans`
    pub async fn list_bans(&self) -> Result<Vec<Ban>, Error> {
        let payload: Option<BansPayload> = self.send_empty(Method::GET, &["bans"], &[]).await?;
        Ok(payload.map(|p| p.bans).unwrap_or_default())
    }

    /// Find the ban with exactly this key. An unscoped key never matches a
    /// service-scoped ban, and vice versa.
    pub async fn find_ban(&self, key: &BanKey) -> Result<Option<Ban>, Error> {
        let bans = self.list_bans().await?;
        Ok(bans
            .into_iter()
            .find(|b| key.matches(&b.ip, b.service.as_deref())))
    }

    /// `POST bans` with a one-element array.
    pub async fn ban(&self, request: BanRequest) -> Result<(), Error> {
        debug!(ip = request.ip(), service = ?request.service(), "banning");
        self.send_bans(&["bans"], Method::POST, &Batch::new([request], "ban request")?)
            .await
    }

    /// `DELETE bans` with a one-element array.
    pub async fn unban(&self, request: UnbanRequest) -> Result<(), Error> {
        self.send_bans(
            &["bans"],
            Method::DELETE,
            &Batch::new([request], "unban request")?,
        )
        .await
    }

    /// Ban several keys in one call. Needs at least one request.
    ///
    /// `POST bans/ban`
    pub async fn ban_bulk<I>(&self, requests: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = BanRequest>,
    {
        let batch = Batch::new(requests, "ban request")?;
        debug!(count = batch.len(), "bulk banning");
        self.send_bans(&["bans", "ban"], Method::POST, &batch).await
    }

    /// Lift several bans in one call. Needs at least one request.
    ///
    /// `POST bans/unban`
    pub async fn unban_bulk<I>(&self, requests: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = UnbanRequest>,
    {
        let batch = Batch::new(requests, "unban request")?;
        debug!(count = batch.len(), "bulk unbanning");
        self.send_bans(&["bans", "unban"], Method::POST, &batch).await
    }

    async fn send_bans<T: Serialize + Sync>(
        &self,
        path: &[&str],
        method: Method,
        batch: &Batch<T>,
    ) -> Result<(), Error> {
        let _: Option<IgnoredAny> = self.send_json(method, path, &[], batch).await?;
        Ok(())
    }
}
