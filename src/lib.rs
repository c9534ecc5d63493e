//! OINTment - usage quotas and marketplace plan activation.
//!
//! The library tracks per-user, per-billing-month usage against the
//! marketplace plan, activates paid plans from verified purchase proofs, and
//! serves both over an axum HTTP API.
//!
//! - [`usage`]: plan, billing periods, snapshots, quota rules and stores
//! - [`marketplace`]: purchase-token and webhook verification
//! - [`integration`]: dependency scores for the matrix view
//! - [`api`]: HTTP routes and server
//! - [`config`]: TOML + environment configuration

pub mod api;
pub mod config;
pub mod error;
pub mod integration;
pub mod marketplace;
pub mod usage;

pub use config::Config;
pub use error::{OintmentError, Result};
