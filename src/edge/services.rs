use axum::{
    Json,
    body::Body,
    extract::{Request, State},
    http::header,
    response::{IntoResponse, Response},
};
use tracing::debug;

use super::{error::EdgeError, models::HealthResponse, state::AppState, utils};
use crate::rewrite::rewrite_html_stream;

/// Reverse proxy endpoint, bound as the router fallback so it catches every
/// path not claimed by the operator routes.
///
/// HTML responses are rewritten on the way through: each `<img>` whose
/// source no longer resolves gets pointed at an Internet Archive snapshot
/// instead, falling back to the attribute as it arrived when the archive has
/// nothing. Everything else is relayed as-is.
///
/// ## Flow:
/// 1. Splice the incoming path and query onto the configured origin
/// 2. Strip hop-by-hop headers, plus Host and Accept-Encoding (the origin
///    must answer for its own name, with an identity body we can parse)
/// 3. Forward the request, streaming the client body through
/// 4. Relay the origin's status and headers regardless of the status code;
///    error pages embed images too
/// 5. If the response is identity-coded `text/html`, stream it through the
///    image rewriter and drop the now-wrong Content-Length
/// 6. Otherwise pipe the body through untouched
///
/// Only a failure to reach the origin at all surfaces as an edge error
/// (502). Once a response is streaming, image fixup failures degrade to
/// leaving each attribute as it arrived.
pub async fn proxy(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, EdgeError> {
    let (parts, body) = request.into_parts();

    // Splice the target together rather than joining: a join would treat a
    // path starting with // as a network-path reference and swap out the
    // origin's authority.
    let mut target = state.origin.clone();
    if let Some(pq) = parts.uri.path_and_query() {
        target.set_path(pq.path());
        target.set_query(pq.query());
    }

    let mut headers = parts.headers;
    utils::strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);
    headers.remove(header::ACCEPT_ENCODING);

    debug!(method = %parts.method, %target, "Forwarding to origin");

    let upstream = state
        .directives
        .apply(
            state
                .client
                .request(parts.method, target)
                .headers(headers)
                .body(reqwest::Body::wrap_stream(body.into_data_stream())),
        )
        .send()
        .await?;

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    utils::strip_hop_by_hop(&mut headers);

    let rewritable = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(utils::is_html_content_type)
        && utils::is_identity_encoding(&headers);

    let body = if rewritable {
        // Rewriting changes the length; the body goes out chunked.
        headers.remove(header::CONTENT_LENGTH);
        state.metrics.page_rewritten();
        rewrite_html_stream(upstream.bytes_stream(), state.fixer.clone())
    } else {
        Body::from_stream(upstream.bytes_stream())
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// Health check endpoint (GET /operators/health)
///
/// Returns liveness plus the image fixup counters. The proxy holds no
/// stateful components; if it can respond, it is healthy.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        counters: state.metrics.snapshot(),
    };

    (axum::http::StatusCode::OK, Json(response))
}
