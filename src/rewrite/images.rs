//! The `<img>` element handler

use lol_html::html_content::Element;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Attribute the delivery tier parks the original source in when its own
/// lazy-load rewrite did not finish.
const FALLBACK_SRC_ATTR: &str = "data-cfsrc";

/// One image source awaiting resolution, sent from the rewriter thread to
/// the async side.
pub(crate) struct FixRequest {
    pub(crate) url: String,
    pub(crate) reply: oneshot::Sender<String>,
}

#[derive(Debug, Error)]
#[error("fix pipeline closed before the element resolved")]
struct FixPipelineClosed;

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Handler invoked for every `<img>` in the document.
///
/// Parks the rewriter thread on each source until the async side answers,
/// so sources resolve one at a time, in document order.
pub(crate) fn rewrite_img(el: &mut Element, fix_tx: &mpsc::Sender<FixRequest>) -> HandlerResult {
    let mut candidate = el.get_attribute("src");
    if candidate.as_deref().is_none_or(str::is_empty) {
        candidate = el.get_attribute(FALLBACK_SRC_ATTR);
        el.remove_attribute(FALLBACK_SRC_ATTR);
    }

    let Some(url) = candidate.filter(|url| !url.is_empty()) else {
        return Ok(());
    };

    let (reply_tx, reply_rx) = oneshot::channel();
    fix_tx
        .blocking_send(FixRequest {
            url,
            reply: reply_tx,
        })
        .map_err(|_| FixPipelineClosed)?;
    let fixed = reply_rx.blocking_recv().map_err(|_| FixPipelineClosed)?;

    el.set_attribute("src", &fixed)?;
    Ok(())
}
