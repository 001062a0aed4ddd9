// Endpoint groups, one `impl BunkerWebClient` block per resource family.

mod bans;
mod cache;
mod configs;
mod global_config;
mod instances;
mod jobs;
mod plugins;
mod services;
mod system;

use crate::error::Error;
use crate::keys::check_segment;

/// Trim a path identifier, rejecting blank and dot values before any request.
pub(crate) fn identifier<'a>(value: &'a str, what: &str) -> Result<&'a str, Error> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{what} cannot be empty")));
    }
    check_segment(trimmed, what)?;
    Ok(trimmed)
}
