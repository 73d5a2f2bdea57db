use std::sync::Arc;

use reqwest::Client;
use url::Url;

use crate::config::Config;
use crate::fetch::FetchDirectives;
use crate::fixup::ImageFixer;
use crate::observability::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Base every incoming request path is joined onto.
    pub origin: Url,
    pub client: Client,
    pub directives: FetchDirectives,
    pub fixer: Arc<dyn ImageFixer>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        origin: Url,
        client: Client,
        fixer: Arc<dyn ImageFixer>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            origin,
            client,
            directives: FetchDirectives::default(),
            fixer,
            metrics,
        }
    }
}
