//! HTTP API.
//!
//! `api_router()` returns a composable `Router`; `start_server_on()` binds
//! it and runs it in the background until shut down.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_server_on, ApiServer, ServerError, ServerSession};
pub use types::ApiContext;
