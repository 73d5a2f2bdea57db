//! Outbound HTTP plumbing shared by the proxy and the image fixer

pub mod directives;

use std::time::Duration;

use reqwest::{Client, redirect};

use crate::config::UpstreamConfig;

pub use directives::{FetchDirectives, Recompression};

const MAX_REDIRECTS: usize = 10;

/// Build the shared upstream client from configuration.
///
/// One client serves origin fetches, liveness probes, and archive lookups,
/// so connection pools are shared across all three.
pub fn build_client(config: &UpstreamConfig) -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .user_agent(&config.user_agent)
        .redirect(redirect::Policy::limited(MAX_REDIRECTS))
        .build()
}
