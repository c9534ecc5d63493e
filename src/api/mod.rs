//! HTTP surface: usage metering, marketplace activation, integration matrix.

pub mod error;
pub mod routes;
pub mod server;

pub use server::{build_router, start_server, AppState};
