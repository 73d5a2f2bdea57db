mod error;
pub mod models;
mod server;
pub mod services;
pub mod state;
pub(crate) mod utils;

pub use error::EdgeError;
pub use server::{router, run};
pub use state::AppState;
