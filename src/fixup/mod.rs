//! Image source fixup
//!
//! Decides what URL an `<img>` should end up pointing at: the original when
//! it still resolves, an Internet Archive snapshot when it does not, and the
//! dead URL itself when the archive has nothing either.

pub mod archive;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::fetch::FetchDirectives;
use crate::observability::Metrics;

pub use archive::{
    ArchiveError, AvailabilityClient, IMAGE_RENDER_MARKER, WAYBACK_AVAILABLE_ENDPOINT,
};

/// Resolves an image source attribute to a usable URL.
///
/// Implementations must be cheap to share; one fixer serves every element of
/// every in-flight page.
#[async_trait]
pub trait ImageFixer: Send + Sync {
    /// Return the URL the `src` attribute should carry.
    ///
    /// This never fails. When no better source exists the candidate itself
    /// comes back, leaving the markup no worse than it arrived.
    async fn fix_image_url(&self, src: &str) -> String;
}

/// What a liveness probe learned about a candidate URL.
struct ProbeOutcome {
    usable: bool,
    /// Where the probe ended up after redirects, or the candidate itself
    /// when no response came back.
    resolved_url: String,
}

/// Production fixer backed by HEAD probes and the Wayback Machine.
pub struct WaybackFixer {
    client: Client,
    directives: FetchDirectives,
    archive: AvailabilityClient,
    metrics: Arc<Metrics>,
}

impl WaybackFixer {
    pub fn new(client: Client, metrics: Arc<Metrics>) -> Self {
        Self::with_archive_endpoint(client, metrics, WAYBACK_AVAILABLE_ENDPOINT)
    }

    /// Build a fixer that asks a different availability endpoint.
    pub fn with_archive_endpoint(
        client: Client,
        metrics: Arc<Metrics>,
        endpoint: impl Into<String>,
    ) -> Self {
        let directives = FetchDirectives::default();
        let archive = AvailabilityClient::with_endpoint(client.clone(), directives, endpoint);
        Self {
            client,
            directives,
            archive,
            metrics,
        }
    }

    /// HEAD the candidate to learn whether it still serves.
    ///
    /// 405 counts as alive; plenty of image hosts reject HEAD while serving
    /// GET just fine. A request that never completes counts as dead.
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let request = self.directives.apply(self.client.head(url));

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                ProbeOutcome {
                    usable: status.is_success() || status == StatusCode::METHOD_NOT_ALLOWED,
                    resolved_url: response.url().as_str().to_owned(),
                }
            }
            Err(error) => {
                debug!(url, %error, "Liveness probe did not complete");
                ProbeOutcome {
                    usable: false,
                    resolved_url: url.to_owned(),
                }
            }
        }
    }
}

#[async_trait]
impl ImageFixer for WaybackFixer {
    async fn fix_image_url(&self, src: &str) -> String {
        // Host-relative sources resolve against the page's own host; nothing
        // to probe.
        if src.starts_with('/') {
            return src.to_owned();
        }

        self.metrics.image_probed();
        let probe = self.probe(src).await;
        if probe.usable {
            return probe.resolved_url;
        }

        match self.archive.closest_image_snapshot(src).await {
            Ok(snapshot) => {
                info!(original = src, snapshot = %snapshot, "Fixed image");
                self.metrics.image_fixed();
                snapshot.into()
            }
            Err(reason) => {
                warn!(url = src, %reason, "Missing image");
                self.metrics.image_missing();
                probe.resolved_url
            }
        }
    }
}
