//! GitLab adapter
//!
//! Thin REST v4 client covering what a merge request review needs: project
//! lookup by path, merge request changes with their diff refs, and inline
//! discussions anchored to a new-file line.

mod client;
pub mod errors;
mod types;

pub use client::*;
pub use errors::*;
pub use types::*;
