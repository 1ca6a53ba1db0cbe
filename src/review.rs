//! Merge request review pipeline
//!
//! Resolves the project, fetches the merge request diff, asks the reviewer
//! about each changed file and posts the findings as inline discussions.
//! Per-line outcomes are collected as human-readable status lines.

use std::sync::Arc;

use genie_core_types::ReviewRequest;
use gitlab_adapter::{
    DiffRefs, FileChange, GitLabError, InlineComment, MergeRequestApi, MergeRequestChanges,
};
use review_engine::{
    extract_line_numbers, nearest_line, parse_model_output, parse_plain_text_review,
    review_by_hunks, split_hunks, CodeReviewer, DiffHunk, LineMapping, ReviewComments,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::errors::{GenieError, GenieResult};

pub const REVIEW_COMPLETED: &str = "Review completed";
pub const NO_CHANGES: &str = "No changes detected in MR.";

/// Body returned by `POST /review`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewReport {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Vec<String>>,
}

impl ReviewReport {
    pub fn no_changes() -> Self {
        Self {
            message: NO_CHANGES.to_string(),
            status: None,
        }
    }

    pub fn completed(status: Vec<String>) -> Self {
        Self {
            message: REVIEW_COMPLETED.to_string(),
            status: Some(status),
        }
    }
}

/// Where comments for the current merge request go.
struct PostTarget<'a> {
    project_id: u64,
    merge_request_iid: &'a str,
    diff_refs: &'a DiffRefs,
}

#[derive(Clone)]
pub struct ReviewService {
    gitlab: Arc<dyn MergeRequestApi>,
    reviewer: Arc<dyn CodeReviewer>,
}

impl ReviewService {
    pub fn new(gitlab: Arc<dyn MergeRequestApi>, reviewer: Arc<dyn CodeReviewer>) -> Self {
        Self { gitlab, reviewer }
    }

    #[instrument(skip_all, fields(request = %request))]
    pub async fn review(&self, request: &ReviewRequest) -> GenieResult<ReviewReport> {
        let iid = request
            .subject_id
            .as_deref()
            .map(str::trim)
            .filter(|iid| !iid.is_empty())
            .ok_or(GenieError::MissingMergeRequest)?;

        let project_id = self.resolve_project(&request.subject_path).await?;
        let MergeRequestChanges { changes, diff_refs } =
            self.gitlab.merge_request_changes(project_id, iid).await?;
        if changes.is_empty() {
            info!(project_id, iid, "Merge request has no changes");
            return Ok(ReviewReport::no_changes());
        }

        let target = PostTarget {
            project_id,
            merge_request_iid: iid,
            diff_refs: &diff_refs,
        };
        let mut status = Vec::new();
        for change in &changes {
            self.review_change(&target, change, &mut status).await;
        }

        info!(
            project_id,
            iid,
            files = changes.len(),
            statuses = status.len(),
            "Review completed"
        );
        Ok(ReviewReport::completed(status))
    }

    async fn resolve_project(&self, project_path: &str) -> GenieResult<u64> {
        match self.gitlab.project_id(project_path).await {
            Ok(id) => Ok(id),
            Err(GitLabError::MissingProjectId) => Err(GenieError::ProjectIdMissing),
            Err(err @ GitLabError::Status { .. }) => {
                warn!(project_path, error = %err, "Project lookup rejected");
                Err(GenieError::ProjectLookup(err))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn review_change(
        &self,
        target: &PostTarget<'_>,
        change: &FileChange,
        status: &mut Vec<String>,
    ) {
        let path = change.display_path();
        let diff = change.diff.as_str();
        let file_mapping = extract_line_numbers(diff);
        debug!(path, added = file_mapping.len(), "Reviewing file");

        let hunks = split_hunks(diff);
        if review_by_hunks(diff, &hunks) {
            debug!(path, hunks = hunks.len(), "Reviewing by hunks");
            for hunk in &hunks {
                self.review_hunk(target, path, &file_mapping, hunk, status)
                    .await;
            }
            return;
        }

        let review = match self.reviewer.review(diff, Some(path), &file_mapping).await {
            Ok(text) => text,
            Err(err) => {
                warn!(path, error = %err, "Review generation failed");
                status.push(format!("❌ Review failed for {path} ({err})"));
                return;
            }
        };
        let comments = parse_model_output(&review);
        if comments.is_empty() {
            status.push(format!("ℹ️ No review issues found in {path}"));
            return;
        }
        self.post_comments(target, path, &file_mapping, &comments, status)
            .await;
    }

    async fn review_hunk(
        &self,
        target: &PostTarget<'_>,
        path: &str,
        file_mapping: &LineMapping,
        hunk: &DiffHunk,
        status: &mut Vec<String>,
    ) {
        let hunk_diff = hunk.text();
        let hunk_mapping = extract_line_numbers(&hunk_diff);

        let review = match self
            .reviewer
            .review(&hunk_diff, Some(path), &hunk_mapping)
            .await
        {
            Ok(text) => text,
            Err(err) => {
                warn!(path, hunk = %hunk.header, error = %err, "Hunk review failed");
                status.push(format!("❌ Review failed for hunk of {path} ({err})"));
                return;
            }
        };
        let parsed = parse_plain_text_review(&review);
        if parsed.is_empty() {
            status.push(format!("ℹ️ No review issues found in hunk of {path}"));
            return;
        }

        for (line, comment) in parsed {
            match nearest_line(&hunk_mapping, line) {
                Some(mapped) => {
                    let single = ReviewComments::from([(mapped, comment)]);
                    self.post_comments(target, path, file_mapping, &single, status)
                        .await;
                }
                None => status.push(format!(
                    "❌ Could not map hunk line {line} to global line in {path}"
                )),
            }
        }
    }

    /// Posts each comment whose line was added by this file's diff.
    async fn post_comments(
        &self,
        target: &PostTarget<'_>,
        path: &str,
        file_mapping: &LineMapping,
        comments: &ReviewComments,
        status: &mut Vec<String>,
    ) {
        for (line, body) in comments {
            if !file_mapping.contains_key(line) {
                debug!(path, line, "Skipping comment outside the diff");
                status.push(format!("⏭️ Skipped {path}:{line} (not in diff mapping)"));
                continue;
            }
            let comment = InlineComment {
                path: path.to_string(),
                new_line: *line,
                body: body.clone(),
            };
            match self
                .gitlab
                .create_discussion(
                    target.project_id,
                    target.merge_request_iid,
                    target.diff_refs,
                    &comment,
                )
                .await
            {
                Ok(()) => status.push(format!("✅ Commented {path}:{line}")),
                Err(err) => {
                    warn!(path, line, error = %err, "Failed to post comment");
                    status.push(format!("❌ Failed {path}:{line} ({err})"));
                }
            }
        }
    }
}
