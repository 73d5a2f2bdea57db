use super::models::Config;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Origin base_url is not a valid URL: {url}")]
    InvalidOriginUrl { url: String },

    #[error("Origin base_url must use http or https, got '{scheme}'")]
    UnsupportedOriginScheme { scheme: String },

    #[error("Origin base_url must not carry a path, query, or fragment: {url}")]
    OriginNotAuthorityOnly { url: String },

    #[error("Upstream timeout must be positive: {field}")]
    InvalidUpstreamTimeout { field: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_origin(config)?;
    validate_upstream(config)?;
    Ok(())
}

/// Ensure the origin is an http(s) URL naming a host and nothing more
fn validate_origin(config: &Config) -> Result<(), ValidationError> {
    let base_url = &config.origin.base_url;

    let url = Url::parse(base_url).map_err(|_| ValidationError::InvalidOriginUrl {
        url: base_url.clone(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ValidationError::UnsupportedOriginScheme {
                scheme: scheme.to_string(),
            });
        }
    }

    // Request paths are joined onto the origin verbatim, so the origin
    // itself must stop at the authority.
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(ValidationError::OriginNotAuthorityOnly {
            url: base_url.clone(),
        });
    }

    Ok(())
}

/// Reject zero timeouts, which would fail every upstream request
fn validate_upstream(config: &Config) -> Result<(), ValidationError> {
    if config.upstream.connect_timeout_secs == 0 {
        return Err(ValidationError::InvalidUpstreamTimeout {
            field: "connect_timeout_secs".to_string(),
        });
    }

    if config.upstream.request_timeout_secs == 0 {
        return Err(ValidationError::InvalidUpstreamTimeout {
            field: "request_timeout_secs".to_string(),
        });
    }

    Ok(())
}
