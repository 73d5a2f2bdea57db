pub mod config;
pub mod edge;
pub mod fetch;
pub mod fixup;
pub mod observability;
pub mod rewrite;
