// Scheduler job endpoints

use reqwest::Method;
use serde::de::IgnoredAny;
use tracing::debug;

use crate::batch::{Batch, JobsRun};
use crate::client::BunkerWebClient;
use crate::error::Error;
use crate::models::{Job, JobItem, JobsPayload};

impl BunkerWebClient {
    /// `GET jobs`
    pub async fn list_jobs(&self) -> Result<Vec<Job>, Error> {
        let payload: Option<JobsPayload> = self.send_empty(Method::GET, &["jobs"], &[]).await?;
        Ok(payload.map(|p| p.jobs).unwrap_or_default())
    }

    /// Trigger jobs immediately. Needs at least one job.
    ///
    /// `POST jobs/run` with `{"jobs": [...]}`
    pub async fn run_jobs<I>(&self, jobs: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = JobItem>,
    {
        let batch = Batch::new(jobs, "job")?;
        debug!(count = batch.len(), "running jobs");
        let _: Option<IgnoredAny> = self
            .send_json(Method::POST, &["jobs", "run"], &[], &JobsRun { jobs: &batch })
            .await?;
        Ok(())
    }
}
