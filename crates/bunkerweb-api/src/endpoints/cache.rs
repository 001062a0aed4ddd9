// Job cache endpoints (read-only)

use reqwest::Method;

use crate::client::BunkerWebClient;
use crate::error::Error;
use crate::models::{CacheEntry, CacheFilter, CachePayload};

impl BunkerWebClient {
    /// `GET cache` with optional `service`, `plugin`, `job_name`, `with_data` filters.
    pub async fn list_cache_entries(&self, filter: &CacheFilter) -> Result<Vec<CacheEntry>, Error> {
        let payload: Option<CachePayload> = self
            .send_empty(Method::GET, &["cache"], &filter.query())
            .await?;
        Ok(payload.map(|p| p.cache).unwrap_or_default())
    }
}
