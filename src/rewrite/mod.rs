//! Streaming HTML rewriting

mod images;
mod stream;

pub use stream::{RewriteError, rewrite_html_stream};
