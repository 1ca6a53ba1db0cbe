//! One-shot element waits

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{self, BoxFuture, FutureExt};
use host_dom::{Document, MutationObserver, NodeId, ObserverOptions, Selector, Tree, WeakDocument};
use tracing::{debug, trace};

use crate::errors::WatchError;

/// Mount point candidates on a merge request page, highest priority first.
pub const DEFAULT_MOUNT_SELECTORS: [&str; 2] = [".gl-button-group", ".mr-state-container + div"];

/// Parses a priority list of selectors, failing on the first bad one.
pub fn parse_selectors<S: AsRef<str>>(sources: &[S]) -> Result<Vec<Selector>, WatchError> {
    sources
        .iter()
        .map(|source| Selector::parse(source.as_ref()).map_err(WatchError::from))
        .collect()
}

/// First match under `root` for the highest-priority selector that matches
/// anything. Document order only breaks ties within one selector.
pub fn find_first(tree: &Tree, root: NodeId, selectors: &[Selector]) -> Option<NodeId> {
    selectors
        .iter()
        .find_map(|selector| tree.query_selector_from(root, selector, false))
}

type WaitOutput = Result<NodeId, WatchError>;

enum WaitState {
    Immediate(future::Ready<WaitOutput>),
    Watching(BoxFuture<'static, WaitOutput>),
}

/// Future returned by [`wait_for_element`]. Resolves exactly once.
pub struct ElementWait {
    state: WaitState,
}

impl ElementWait {
    /// True when the element was already present at call time.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, WaitState::Immediate(_))
    }
}

impl fmt::Debug for ElementWait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            WaitState::Immediate(_) => "immediate",
            WaitState::Watching(_) => "watching",
        };
        f.debug_struct("ElementWait").field("state", &state).finish()
    }
}

impl Future for ElementWait {
    type Output = WaitOutput;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            WaitState::Immediate(ready) => Pin::new(ready).poll(cx),
            WaitState::Watching(watch) => watch.as_mut().poll(cx),
        }
    }
}

/// Waits for the first element matching `selectors` (in priority order)
/// under `root`, or under `body` when no root is given.
///
/// The observer is registered before this function returns, so changes made
/// between the call and the first poll are not missed. The returned future
/// holds only a weak handle to the document.
pub fn wait_for_element(
    document: &Document,
    selectors: Vec<Selector>,
    root: Option<NodeId>,
) -> ElementWait {
    let root = root.unwrap_or_else(|| document.body());
    let options = ObserverOptions::structural();

    let observer = match document.probe_or_observe(root, options, |tree| {
        find_first(tree, root, &selectors)
    }) {
        Ok(node) => {
            debug!(node = %node, "Element already present");
            return ElementWait {
                state: WaitState::Immediate(future::ready(Ok(node))),
            };
        }
        Err(observer) => observer,
    };

    debug!(
        root = %root,
        selectors = ?selectors.iter().map(Selector::as_str).collect::<Vec<_>>(),
        "Watching for element"
    );
    let watch = watch_until_match(observer, document.downgrade(), root, selectors);
    ElementWait {
        state: WaitState::Watching(watch.boxed()),
    }
}

async fn watch_until_match(
    mut observer: MutationObserver,
    page: WeakDocument,
    root: NodeId,
    selectors: Vec<Selector>,
) -> WaitOutput {
    loop {
        // An empty batch means the observer lagged; re-check anyway.
        let records = observer.next().await?;
        trace!(records = records.len(), "Structural change observed");

        let document = page.upgrade().ok_or(WatchError::DocumentClosed)?;
        if let Some(node) = document.read(|tree| find_first(tree, root, &selectors)) {
            observer.disconnect();
            debug!(node = %node, "Element appeared");
            return Ok(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::{sleep, timeout, Instant};

    fn page() -> Document {
        Document::new("https://gitlab.com/group/app/-/merge_requests/7").unwrap()
    }

    fn mount_selectors() -> Vec<Selector> {
        parse_selectors(&DEFAULT_MOUNT_SELECTORS).unwrap()
    }

    fn div_with_class(document: &Document, class: &str) -> NodeId {
        let div = document.create_element("div");
        document.set_attribute(div, "class", class).unwrap();
        div
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_immediately_without_observer() {
        let document = page();
        let group = div_with_class(&document, "gl-button-group");
        document.append_child(document.body(), group).unwrap();

        let wait = wait_for_element(&document, mount_selectors(), None);
        assert!(wait.is_ready());
        assert_eq!(document.observer_count(), 0);
        assert_eq!(wait.await, Ok(group));
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_when_region_is_rendered_later() {
        let document = page();
        let started = Instant::now();
        let wait = wait_for_element(&document, mount_selectors(), None);
        assert!(!wait.is_ready());
        assert_eq!(document.observer_count(), 1);

        let renderer = document.clone();
        let rendered = tokio::spawn(async move {
            sleep(Duration::from_secs(1)).await;
            let group = div_with_class(&renderer, "gl-button-group");
            renderer.append_child(renderer.body(), group).unwrap();
            group
        });

        let node = wait.await.unwrap();
        assert_eq!(node, rendered.await.unwrap());
        assert_eq!(started.elapsed(), Duration::from_secs(1));
        assert_eq!(document.observer_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn earlier_selector_wins_over_document_order() {
        let document = page();
        let body = document.body();
        let state = div_with_class(&document, "mr-state-container");
        let sibling = document.create_element("div");
        let group = div_with_class(&document, "gl-button-group");
        document
            .mutate(|m| {
                m.append_child(body, state)?;
                m.append_child(body, sibling)?;
                m.append_child(body, group)
            })
            .unwrap();

        let wait = wait_for_element(&document, mount_selectors(), None);
        assert_eq!(wait.await, Ok(group));
    }

    #[tokio::test(start_paused = true)]
    async fn attribute_changes_do_not_trigger_recheck() {
        let document = page();
        let body = document.body();
        let candidate = document.create_element("div");
        document.append_child(body, candidate).unwrap();

        let mut wait = wait_for_element(&document, mount_selectors(), None);
        document
            .set_attribute(candidate, "class", "gl-button-group")
            .unwrap();
        assert!(timeout(Duration::from_secs(5), &mut wait).await.is_err());

        // Any structural change under the root re-runs the check.
        let unrelated = document.create_element("span");
        document.append_child(body, unrelated).unwrap();
        assert_eq!(wait.await, Ok(candidate));
    }

    #[tokio::test(start_paused = true)]
    async fn only_watches_inside_root() {
        let document = page();
        let body = document.body();
        let panel = document.create_element("section");
        document.append_child(body, panel).unwrap();

        let mut wait = wait_for_element(&document, mount_selectors(), Some(panel));
        let outside = div_with_class(&document, "gl-button-group");
        document.append_child(body, outside).unwrap();
        assert!(timeout(Duration::from_secs(1), &mut wait).await.is_err());

        let inside = div_with_class(&document, "gl-button-group");
        document.append_child(panel, inside).unwrap();
        assert_eq!(wait.await, Ok(inside));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_wait_detaches_observer() {
        let document = page();
        let first = wait_for_element(&document, mount_selectors(), None);
        let second = wait_for_element(&document, mount_selectors(), None);
        assert_eq!(document.observer_count(), 2);

        drop(first);
        assert_eq!(document.observer_count(), 1);

        let group = div_with_class(&document, "gl-button-group");
        document.append_child(document.body(), group).unwrap();
        assert_eq!(second.await, Ok(group));
        assert_eq!(document.observer_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_document_fails_the_wait() {
        let document = page();
        let wait = wait_for_element(&document, mount_selectors(), None);
        drop(document);
        assert_eq!(wait.await, Err(WatchError::DocumentClosed));
    }

    #[test]
    fn rejects_unsupported_selector() {
        assert!(matches!(
            parse_selectors(&[".ok", "a::before"]),
            Err(WatchError::InvalidSelector(_))
        ));
    }
}
