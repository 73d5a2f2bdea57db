//! Internet Archive availability lookups
//!
//! Queries the Wayback Machine for the closest snapshot of a dead image and
//! rewrites the snapshot URL into its raw image rendition.

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::fetch::FetchDirectives;

/// Public availability endpoint of the Wayback Machine.
pub const WAYBACK_AVAILABLE_ENDPOINT: &str = "https://archive.org/wayback/available";

/// Wayback rendition flag for the bare image, without the replay chrome.
pub const IMAGE_RENDER_MARKER: &str = "im_";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("availability lookup failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("no archived snapshot for the url")]
    NoSnapshot,

    #[error("snapshot url is unparseable: {0}")]
    InvalidSnapshotUrl(String),

    #[error("snapshot path carries no embedded source url")]
    MissingSourceSegment,
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Shape of the availability API response. Fields we do not read are ignored.
#[derive(Debug, Deserialize)]
struct AvailabilityResponse {
    #[serde(default)]
    archived_snapshots: ArchivedSnapshots,
}

#[derive(Debug, Default, Deserialize)]
struct ArchivedSnapshots {
    closest: Option<ClosestSnapshot>,
}

#[derive(Debug, Deserialize)]
struct ClosestSnapshot {
    url: String,
}

/// Client for the Wayback availability API.
#[derive(Debug, Clone)]
pub struct AvailabilityClient {
    client: Client,
    directives: FetchDirectives,
    endpoint: String,
}

impl AvailabilityClient {
    pub fn new(client: Client, directives: FetchDirectives) -> Self {
        Self::with_endpoint(client, directives, WAYBACK_AVAILABLE_ENDPOINT)
    }

    /// Point the client at a different availability endpoint.
    pub fn with_endpoint(
        client: Client,
        directives: FetchDirectives,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client,
            directives,
            endpoint: endpoint.into(),
        }
    }

    /// Look up the closest snapshot of `image_url` and return it as a raw
    /// image URL.
    pub async fn closest_image_snapshot(&self, image_url: &str) -> Result<Url> {
        debug!(url = image_url, "Querying archive availability");

        let request = self
            .directives
            .apply(self.client.get(&self.endpoint).query(&[("url", image_url)]));

        let availability: AvailabilityResponse = request.send().await?.json().await?;

        let closest = availability
            .archived_snapshots
            .closest
            .ok_or(ArchiveError::NoSnapshot)?;

        let snapshot = Url::parse(&closest.url)
            .map_err(|_| ArchiveError::InvalidSnapshotUrl(closest.url))?;

        as_image_snapshot(snapshot)
    }
}

/// Turn a replay snapshot URL into its raw image rendition.
///
/// Snapshot paths embed the source URL after the capture timestamp, for
/// example `/web/20200101000000/http://example.com/x.png`. Inserting the
/// `im_` flag after the timestamp makes the Wayback Machine serve the image
/// bytes instead of the replay page.
fn as_image_snapshot(mut snapshot: Url) -> Result<Url> {
    let path = snapshot.path().to_owned();

    let anchor = path.find("http").ok_or(ArchiveError::MissingSourceSegment)?;
    let marker_at = anchor
        .checked_sub(1)
        .ok_or(ArchiveError::MissingSourceSegment)?;

    let rewritten = format!(
        "{}{}{}",
        &path[..marker_at],
        IMAGE_RENDER_MARKER,
        &path[marker_at..]
    );
    snapshot.set_path(&rewritten);

    Ok(snapshot)
}
