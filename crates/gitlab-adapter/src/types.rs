//! Wire types for the merge request endpoints

use serde::{Deserialize, Serialize};

/// One changed file of a merge request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    #[serde(default)]
    pub old_path: Option<String>,
    #[serde(default)]
    pub new_path: Option<String>,
    #[serde(default)]
    pub diff: String,
}

impl FileChange {
    /// Path used for comments: the new path, falling back to the old one.
    pub fn display_path(&self) -> &str {
        self.new_path
            .as_deref()
            .filter(|path| !path.is_empty())
            .or(self.old_path.as_deref())
            .unwrap_or_default()
    }
}

/// Commit triple a text position is anchored to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRefs {
    #[serde(default)]
    pub base_sha: String,
    #[serde(default)]
    pub start_sha: String,
    #[serde(default)]
    pub head_sha: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ChangesResponse {
    #[serde(default)]
    pub(crate) changes: Vec<FileChange>,
    #[serde(default)]
    pub(crate) diff_refs: DiffRefs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequestChanges {
    pub changes: Vec<FileChange>,
    pub diff_refs: DiffRefs,
}

/// A review comment anchored to one line of the new file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineComment {
    pub path: String,
    pub new_line: u32,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct DiscussionRequest<'a> {
    pub(crate) body: &'a str,
    pub(crate) position: TextPosition<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TextPosition<'a> {
    pub(crate) position_type: &'static str,
    pub(crate) new_path: &'a str,
    pub(crate) old_path: &'a str,
    pub(crate) new_line: u32,
    pub(crate) base_sha: &'a str,
    pub(crate) head_sha: &'a str,
    pub(crate) start_sha: &'a str,
}
