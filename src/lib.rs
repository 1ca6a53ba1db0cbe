//! Genie review library
//!
//! Exposes the review backend for the binary and for integration testing

pub mod config;
pub mod errors;
pub mod review;
pub mod server;

pub use config::Config;
pub use errors::{GenieError, GenieResult};
pub use review::{ReviewReport, ReviewService};
