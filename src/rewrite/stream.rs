//! Streaming HTML rewrite pipeline
//!
//! The rewriter itself is synchronous while source resolution needs the
//! network. The rewriter therefore runs on a blocking thread, fed and
//! drained over bounded channels, with a oneshot handshake per image source
//! back into async land.

use std::pin::pin;
use std::sync::Arc;

use axum::body::Body;
use bytes::Bytes;
use lol_html::{HtmlRewriter, Settings, element};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task;
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};
use tracing::debug;

use super::images::{self, FixRequest};
use crate::fixup::ImageFixer;

/// Chunks buffered on either side of the rewriter thread before
/// backpressure stalls it.
const CHUNK_BUFFER: usize = 16;

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("upstream body failed mid-stream: {0}")]
    Upstream(String),

    #[error("html rewrite failed: {0}")]
    Rewriter(String),
}

/// Rewrite an HTML byte stream, resolving `<img>` sources as it flows.
///
/// Output chunks become available as soon as the rewriter emits them, so
/// the client sees bytes before the upstream body has finished arriving.
/// An upstream or rewriter failure surfaces as a body error, aborting the
/// transfer mid-stream.
pub fn rewrite_html_stream<S, E>(upstream: S, fixer: Arc<dyn ImageFixer>) -> Body
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + 'static,
{
    let (input_tx, input_rx) = mpsc::channel(CHUNK_BUFFER);
    let (output_tx, output_rx) = mpsc::channel(CHUNK_BUFFER);
    let (fix_tx, fix_rx) = mpsc::channel(1);

    tokio::spawn(resolve_sources(fix_rx, fixer));
    tokio::spawn(pump_upstream(upstream, input_tx));
    task::spawn_blocking(move || drive_rewriter(input_rx, output_tx, fix_tx));

    Body::from_stream(ReceiverStream::new(output_rx))
}

/// Answer fix requests coming off the rewriter thread, one at a time.
async fn resolve_sources(mut fix_rx: mpsc::Receiver<FixRequest>, fixer: Arc<dyn ImageFixer>) {
    while let Some(FixRequest { url, reply }) = fix_rx.recv().await {
        let fixed = fixer.fix_image_url(&url).await;
        // The rewriter may have been torn down while we resolved.
        let _ = reply.send(fixed);
    }
}

/// Feed upstream chunks to the rewriter thread.
async fn pump_upstream<S, E>(upstream: S, input_tx: mpsc::Sender<Result<Bytes, RewriteError>>)
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + 'static,
{
    let mut upstream = pin!(upstream);
    while let Some(chunk) = upstream.next().await {
        let chunk = chunk.map_err(|error| RewriteError::Upstream(error.to_string()));
        let fatal = chunk.is_err();
        if input_tx.send(chunk).await.is_err() {
            // Rewriter gone; the client hung up or the parse failed.
            return;
        }
        if fatal {
            return;
        }
    }
}

/// Run the synchronous rewriter until the input is exhausted.
fn drive_rewriter(
    mut input_rx: mpsc::Receiver<Result<Bytes, RewriteError>>,
    output_tx: mpsc::Sender<Result<Bytes, RewriteError>>,
    fix_tx: mpsc::Sender<FixRequest>,
) {
    let sink_tx = output_tx.clone();
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![element!("img", move |el| {
                images::rewrite_img(el, &fix_tx)
            })],
            ..Settings::default()
        },
        move |chunk: &[u8]| {
            let _ = sink_tx.blocking_send(Ok(Bytes::copy_from_slice(chunk)));
        },
    );

    while let Some(chunk) = input_rx.blocking_recv() {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(error) => {
                let _ = output_tx.blocking_send(Err(error));
                return;
            }
        };
        if output_tx.is_closed() {
            debug!("Client went away mid-rewrite, abandoning the parse");
            return;
        }
        if let Err(error) = rewriter.write(&chunk) {
            let _ = output_tx.blocking_send(Err(RewriteError::Rewriter(error.to_string())));
            return;
        }
    }

    if let Err(error) = rewriter.end() {
        let _ = output_tx.blocking_send(Err(RewriteError::Rewriter(error.to_string())));
    }
}
