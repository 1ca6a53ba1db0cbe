//! Review engine
//!
//! Turns a unified diff into line-anchored review comments:
//! - Maps added lines to their new-file line numbers
//! - Splits large diffs into hunks
//! - Prompts an LLM with the allowed line mapping
//! - Parses the plain-text or JSON review into `{line: comment}`

mod diff;
pub mod errors;
mod openai;
mod parse;
mod prompt;

pub use diff::*;
pub use errors::*;
pub use openai::*;
pub use parse::*;
pub use prompt::*;
