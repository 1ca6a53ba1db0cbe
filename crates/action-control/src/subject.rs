//! Review subject derived from the page location

use genie_core_types::ReviewRequest;
use url::Url;

const REVIEW_PAGE_MARKER: &str = "/-/merge_requests/";
const SECTION_SEPARATOR: &str = "/-/";
const ID_MARKER: &str = "/merge_requests/";

/// Only merge request views get a control.
pub fn is_review_page(location: &Url) -> bool {
    location.path().contains(REVIEW_PAGE_MARKER)
}

/// Builds the request body for the merge request shown at `location`.
///
/// `subject_path` is everything before the first `/-/` without the leading
/// slash; `subject_id` is the run of digits after `/merge_requests/`, if any.
pub fn review_request_for(location: &Url) -> ReviewRequest {
    let path = location.path();
    let before_section = path.split(SECTION_SEPARATOR).next().unwrap_or_default();
    let subject_path = before_section.strip_prefix('/').unwrap_or(before_section);

    let subject_id = path.match_indices(ID_MARKER).find_map(|(at, marker)| {
        let digits: String = path[at + marker.len()..]
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        (!digits.is_empty()).then_some(digits)
    });

    ReviewRequest::new(subject_path, subject_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn detects_merge_request_pages() {
        assert!(is_review_page(&url("https://gitlab.com/group/proj/-/merge_requests/42")));
        assert!(is_review_page(&url(
            "https://gitlab.com/group/proj/-/merge_requests/42/diffs"
        )));
        assert!(!is_review_page(&url("https://gitlab.com/group/proj/-/issues/3")));
        assert!(!is_review_page(&url("https://gitlab.com/group/proj/merge_requests")));
    }

    #[test]
    fn extracts_nested_group_path_and_iid() {
        let request =
            review_request_for(&url("https://gitlab.example.com/group/sub/proj/-/merge_requests/42/diffs"));
        assert_eq!(request.subject_path, "group/sub/proj");
        assert_eq!(request.subject_id.as_deref(), Some("42"));
    }

    #[test]
    fn missing_iid_is_none() {
        let request = review_request_for(&url("https://gitlab.com/group/proj/-/merge_requests/new"));
        assert_eq!(request.subject_path, "group/proj");
        assert_eq!(request.subject_id, None);
    }

    #[test]
    fn serializes_with_backend_field_names() {
        let request = review_request_for(&url("https://gitlab.com/a/b/-/merge_requests/7"));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"project_path": "a/b", "merge_request_iid": "7"})
        );
    }
}
