//! Edge utility functions
//!
//! Pure, stateless helpers for header hygiene and content gating. These are
//! extracted from services.rs to enable unit testing.

use axum::http::{HeaderMap, HeaderName, header};

/// Connection-scoped headers an intermediary must not forward (RFC 9110 §7.6.1).
const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove connection-scoped headers before relaying a message.
pub(crate) fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Connection may name additional per-hop headers; drop those too.
    let connection_named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| name.trim().parse::<HeaderName>().ok())
        .collect();

    for name in connection_named {
        headers.remove(&name);
    }
    for name in HOP_BY_HOP {
        headers.remove(&name);
    }
}

/// True when the Content-Type names an HTML document.
///
/// Accepts `text/html` with or without parameters:
/// - `text/html`
/// - `text/html; charset=utf-8`
///
/// Anything else, `application/xhtml+xml` included, is relayed untouched.
pub(crate) fn is_html_content_type(content_type: &str) -> bool {
    content_type
        .parse::<mime::Mime>()
        .map(|media_type| media_type.type_() == mime::TEXT && media_type.subtype() == mime::HTML)
        .unwrap_or(false)
}

/// True when the body carries no content coding the rewriter would have to
/// undo before parsing.
pub(crate) fn is_identity_encoding(headers: &HeaderMap) -> bool {
    match headers.get(header::CONTENT_ENCODING) {
        None => true,
        Some(value) => value
            .to_str()
            .is_ok_and(|coding| coding.trim().eq_ignore_ascii_case("identity")),
    }
}
