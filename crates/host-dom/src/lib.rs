//! Host document model for the injected review control
//!
//! This crate is the UI binding the watcher and the controller operate on:
//! - An arena tree of elements rooted at `body`
//! - A CSS selector subset (groups, compound steps, `>`, `+`, `~`, descendant)
//! - Structural mutation observers delivered over a broadcast bus
//! - Click listeners honouring the `disabled` flag

mod document;
pub mod errors;
mod mutation;
mod selector;
mod tree;

pub use document::*;
pub use errors::*;
pub use mutation::*;
pub use selector::*;
pub use tree::*;
