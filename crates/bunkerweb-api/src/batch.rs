// Batch request bodies
//
// A batch is one request carrying several items. The control plane applies
// it as a whole and reports one outcome, so an empty batch is rejected
// locally and never sent.

use serde::Serialize;

use crate::error::Error;
use crate::keys::ConfigKey;
use crate::models::JobItem;

/// A non-empty, order-preserving list of batch items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Batch<T>(Vec<T>);

impl<T> Batch<T> {
    /// Collect `items`, failing with a validation error when there are none.
    ///
    /// `noun` names one item in the error message ("ban request", "config").
    pub fn new(items: impl IntoIterator<Item = T>, noun: &str) -> Result<Self, Error> {
        let items: Vec<T> = items.into_iter().collect();
        if items.is_empty() {
            return Err(Error::validation(format!("at least one {noun} is required")));
        }
        Ok(Self(items))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

// ── Keyed wire shapes ────────────────────────────────────────────────

/// `{"configs": [ConfigKey, ...]}` for `DELETE configs`.
#[derive(Serialize)]
pub(crate) struct ConfigsDelete<'a> {
    pub configs: &'a Batch<ConfigKey>,
}

/// `{"instances": ["host", ...]}` for `DELETE instances`.
#[derive(Serialize)]
pub(crate) struct InstancesDelete<'a> {
    pub instances: &'a Batch<String>,
}

/// `{"jobs": [{plugin, name?}, ...]}` for `POST jobs/run`.
#[derive(Serialize)]
pub(crate) struct JobsRun<'a> {
    pub jobs: &'a Batch<JobItem>,
}

/// Trim hostnames, rejecting any that are blank.
pub(crate) fn hostnames<I, S>(hosts: I) -> Result<Batch<String>, Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let hosts = hosts
        .into_iter()
        .map(|h| {
            let h = h.as_ref().trim();
            if h.is_empty() {
                Err(Error::validation("instance hostname cannot be empty"))
            } else {
                Ok(h.to_owned())
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Batch::new(hosts, "instance hostname")
}
