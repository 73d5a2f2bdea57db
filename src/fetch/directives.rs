//! Delivery directives attached to every outbound fetch
//!
//! The values are fixed per deployment and travel as `x-edge-*` request
//! headers so the fronting cache can honor them.

use std::fmt;

use reqwest::RequestBuilder;

/// Recompression applied to fetched images by the delivery tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recompression {
    None,
    Lossy,
    Lossless,
}

impl fmt::Display for Recompression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Recompression::None => "none",
            Recompression::Lossy => "lossy",
            Recompression::Lossless => "lossless",
        };
        f.write_str(label)
    }
}

/// Cache and transform directives for upstream fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchDirectives {
    /// Cache responses regardless of their cacheability headers.
    pub cache_everything: bool,
    /// Edge cache lifetime in seconds.
    pub cache_ttl_secs: u32,
    /// Content scraping protection. Off; it mangles the markup we rewrite.
    pub scrape_shield: bool,
    /// Rewrite image loading to be lazy where the delivery tier supports it.
    pub lazy_load_rewrite: bool,
    pub recompression: Recompression,
}

impl Default for FetchDirectives {
    fn default() -> Self {
        Self {
            cache_everything: true,
            cache_ttl_secs: 86_400,
            scrape_shield: false,
            lazy_load_rewrite: true,
            recompression: Recompression::Lossy,
        }
    }
}

impl FetchDirectives {
    /// Attach the directives to an outbound request as `x-edge-*` headers.
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("x-edge-cache-everything", flag(self.cache_everything))
            .header("x-edge-cache-ttl", self.cache_ttl_secs.to_string())
            .header("x-edge-scrape-shield", flag(self.scrape_shield))
            .header("x-edge-lazy-load", flag(self.lazy_load_rewrite))
            .header("x-edge-recompress", self.recompression.to_string())
    }
}

fn flag(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
