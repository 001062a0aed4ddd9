// Instance action dispatcher
//
// Fans ping/reload/stop out over the whole fleet (one collection call) or an
// explicit host list (one call per host, in order). The first failing host
// aborts the remaining calls; hosts already actioned are not rolled back.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};
use tracing::debug;

use crate::client::BunkerWebClient;
use crate::endpoints::identifier;
use crate::error::Error;

/// An operational action on BunkerWeb instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceAction {
    Ping,
    /// `test: None` leaves the control plane's default (test first).
    Reload {
        test: Option<bool>,
    },
    Stop,
}

impl fmt::Display for InstanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ping => "ping",
            Self::Reload { .. } => "reload",
            Self::Stop => "stop",
        })
    }
}

/// Result of a dispatched action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// Payload of the fleet-wide collection call.
    All(Map<String, Value>),
    /// Payload of each per-host call, keyed by hostname.
    PerHost(BTreeMap<String, Map<String, Value>>),
}

impl BunkerWebClient {
    /// Run `action` on every instance (empty `hosts`) or on each listed host.
    ///
    /// Hostnames are validated up front, so a blank entry fails before any
    /// request is sent.
    pub async fn dispatch_action<S: AsRef<str>>(
        &self,
        action: InstanceAction,
        hosts: &[S],
    ) -> Result<ActionOutcome, Error> {
        if hosts.is_empty() {
            debug!(%action, "dispatching to all instances");
            let payload = match action {
                InstanceAction::Ping => self.ping_instances().await?,
                InstanceAction::Reload { test } => self.reload_instances(test).await?,
                InstanceAction::Stop => self.stop_instances().await?,
            };
            return Ok(ActionOutcome::All(payload));
        }

        let hosts = hosts
            .iter()
            .map(|h| identifier(h.as_ref(), "instance hostname"))
            .collect::<Result<Vec<_>, _>>()?;

        let mut results = BTreeMap::new();
        for host in hosts {
            debug!(%action, host, "dispatching to instance");
            let payload = match action {
                InstanceAction::Ping => self.ping_instance(host).await?,
                InstanceAction::Reload { test } => self.reload_instance(host, test).await?,
                InstanceAction::Stop => self.stop_instance(host).await?,
            };
            results.insert(host.to_owned(), payload);
        }
        Ok(ActionOutcome::PerHost(results))
    }
}
