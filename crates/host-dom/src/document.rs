//! Shared handle to one loaded page

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use genie_core_types::DocumentId;
use genie_event_bus::{EventBus, InMemoryBus};
use parking_lot::Mutex;
use tracing::{debug, trace};
use url::Url;

use crate::errors::DomError;
use crate::mutation::{MutationBatch, MutationObserver, MutationRecord, ObserverOptions};
use crate::selector::Selector;
use crate::tree::{NodeId, Tree};

const MUTATION_CAPACITY: usize = 256;

/// Callback invoked with the clicked element.
pub type ClickListener = Arc<dyn Fn(NodeId) + Send + Sync>;

/// Result of [`Document::dispatch_click`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Number of listeners invoked.
    Delivered(usize),
    /// The element is disabled; no listener ran.
    Disabled,
    /// The element is not attached to the document.
    Detached,
}

struct DocumentInner {
    id: DocumentId,
    location: Url,
    tree: Mutex<Tree>,
    mutations: Arc<InMemoryBus<MutationBatch>>,
    sequence: AtomicU64,
    listeners: Mutex<HashMap<NodeId, Vec<ClickListener>>>,
}

/// Cloneable handle to a host document.
///
/// Every mutation is applied and published while the tree lock is held, so
/// an observer registered under the same lock never misses a change that
/// happened after its registration.
#[derive(Clone)]
pub struct Document {
    inner: Arc<DocumentInner>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.inner.id)
            .field("location", &self.inner.location.as_str())
            .finish()
    }
}

/// Non-owning handle; long-lived waiters hold this so they do not keep a
/// closed page alive.
#[derive(Clone)]
pub struct WeakDocument {
    inner: Weak<DocumentInner>,
}

impl WeakDocument {
    pub fn upgrade(&self) -> Option<Document> {
        self.inner.upgrade().map(|inner| Document { inner })
    }
}

/// Write access to the tree for the duration of one [`Document::mutate`] call.
pub struct Mutator<'a> {
    tree: &'a mut Tree,
    records: Vec<MutationRecord>,
}

impl<'a> Mutator<'a> {
    pub fn tree(&self) -> &Tree {
        self.tree
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.tree.create_element(tag)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let records = self.tree.append_child(parent, child)?;
        self.records.extend(records);
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let record = self.tree.remove_child(parent, child)?;
        self.records.push(record);
        Ok(())
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let record = self.tree.set_attribute(node, name, value)?;
        self.records.push(record);
        Ok(())
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DomError> {
        let record = self.tree.set_text(node, text)?;
        self.records.push(record);
        Ok(())
    }

    pub fn set_style(&mut self, node: NodeId, property: &str, value: &str) -> Result<(), DomError> {
        let record = self.tree.set_style(node, property, value)?;
        self.records.push(record);
        Ok(())
    }

    pub fn set_disabled(&mut self, node: NodeId, disabled: bool) -> Result<(), DomError> {
        let record = self.tree.set_disabled(node, disabled)?;
        self.records.push(record);
        Ok(())
    }
}

impl Document {
    pub fn new(location: &str) -> Result<Self, DomError> {
        let location =
            Url::parse(location).map_err(|err| DomError::InvalidLocation(format!("{location}: {err}")))?;
        let id = DocumentId::new();
        debug!(document = %id.0, location = %location, "Document created");
        Ok(Self {
            inner: Arc::new(DocumentInner {
                id,
                location,
                tree: Mutex::new(Tree::new()),
                mutations: InMemoryBus::new(MUTATION_CAPACITY),
                sequence: AtomicU64::new(0),
                listeners: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn id(&self) -> &DocumentId {
        &self.inner.id
    }

    pub fn downgrade(&self) -> WeakDocument {
        WeakDocument {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn location(&self) -> &Url {
        &self.inner.location
    }

    pub fn body(&self) -> NodeId {
        self.inner.tree.lock().body()
    }

    /// Runs `f` against a read-only view of the tree.
    pub fn read<R>(&self, f: impl FnOnce(&Tree) -> R) -> R {
        let tree = self.inner.tree.lock();
        f(&tree)
    }

    /// Applies several changes as one batch.
    ///
    /// Records produced before an error are still published, since the
    /// changes they describe have already been applied.
    pub fn mutate<R>(
        &self,
        f: impl FnOnce(&mut Mutator<'_>) -> Result<R, DomError>,
    ) -> Result<R, DomError> {
        let mut tree = self.inner.tree.lock();
        let mut mutator = Mutator {
            tree: &mut *tree,
            records: Vec::new(),
        };
        let result = f(&mut mutator);
        let records = mutator.records;
        self.publish(records);
        result
    }

    fn publish(&self, records: Vec<MutationRecord>) {
        if records.is_empty() {
            return;
        }
        let sequence = self.inner.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let count = records.len();
        let delivered = self.inner.mutations.publish(MutationBatch { sequence, records });
        trace!(sequence, count, delivered, "Mutations published");
    }

    /// Creates a detached element. Detached elements are invisible to
    /// queries and observers until appended.
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.inner.tree.lock().create_element(tag)
    }

    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.mutate(|m| m.append_child(parent, child))
    }

    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.mutate(|m| m.remove_child(parent, child))
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.mutate(|m| m.set_attribute(node, name, value))
    }

    pub fn set_text(&self, node: NodeId, text: &str) -> Result<(), DomError> {
        self.mutate(|m| m.set_text(node, text))
    }

    pub fn set_style(&self, node: NodeId, property: &str, value: &str) -> Result<(), DomError> {
        self.mutate(|m| m.set_style(node, property, value))
    }

    pub fn set_disabled(&self, node: NodeId, disabled: bool) -> Result<(), DomError> {
        self.mutate(|m| m.set_disabled(node, disabled))
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, DomError> {
        let selector = Selector::parse(selector)?;
        Ok(self.read(|tree| tree.query_selector(&selector)))
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let selector = Selector::parse(selector)?;
        Ok(self.read(|tree| tree.query_selector_all_from(tree.body(), &selector)))
    }

    pub fn query_selector_from(&self, root: NodeId, selector: &Selector) -> Option<NodeId> {
        self.read(|tree| tree.query_selector_from(root, selector, false))
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.read(|tree| tree.get_element_by_id(id))
    }

    pub fn text(&self, node: NodeId) -> Option<String> {
        self.read(|tree| tree.text(node).map(str::to_string))
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.read(|tree| tree.attribute(node, name).map(str::to_string))
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.read(|tree| tree.style(node, property).map(str::to_string))
    }

    pub fn is_disabled(&self, node: NodeId) -> bool {
        self.read(|tree| tree.is_disabled(node))
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.read(|tree| tree.is_connected(node))
    }

    pub fn observe(&self, root: NodeId, options: ObserverOptions) -> MutationObserver {
        let _tree = self.inner.tree.lock();
        MutationObserver::new(self.inner.mutations.subscribe(), root, options)
    }

    /// Number of live mutation observers.
    pub fn observer_count(&self) -> usize {
        self.inner.mutations.subscriber_count()
    }

    /// Runs `probe` and, only if it finds nothing, registers an observer
    /// under the same lock.
    pub fn probe_or_observe<T>(
        &self,
        root: NodeId,
        options: ObserverOptions,
        probe: impl FnOnce(&Tree) -> Option<T>,
    ) -> Result<T, MutationObserver> {
        let tree = self.inner.tree.lock();
        match probe(&tree) {
            Some(found) => Ok(found),
            None => Err(MutationObserver::new(
                self.inner.mutations.subscribe(),
                root,
                options,
            )),
        }
    }

    pub fn add_click_listener(
        &self,
        node: NodeId,
        listener: impl Fn(NodeId) + Send + Sync + 'static,
    ) -> Result<(), DomError> {
        if !self.read(|tree| tree.exists(node)) {
            return Err(DomError::UnknownNode(node));
        }
        self.inner
            .listeners
            .lock()
            .entry(node)
            .or_default()
            .push(Arc::new(listener));
        Ok(())
    }

    /// Simulates a user click on `node`. Disabled or detached elements
    /// swallow clicks.
    pub fn dispatch_click(&self, node: NodeId) -> Result<DispatchOutcome, DomError> {
        let (connected, disabled) = self.read(|tree| {
            if tree.exists(node) {
                Ok((tree.is_connected(node), tree.is_disabled(node)))
            } else {
                Err(DomError::UnknownNode(node))
            }
        })?;
        if !connected {
            debug!(node = %node, "Click ignored on detached element");
            return Ok(DispatchOutcome::Detached);
        }
        if disabled {
            debug!(node = %node, "Click ignored on disabled element");
            return Ok(DispatchOutcome::Disabled);
        }

        let listeners: Vec<ClickListener> = self
            .inner
            .listeners
            .lock()
            .get(&node)
            .cloned()
            .unwrap_or_default();
        for listener in &listeners {
            listener(node);
        }
        Ok(DispatchOutcome::Delivered(listeners.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn rejects_unparseable_location() {
        assert!(matches!(
            Document::new("not a url"),
            Err(DomError::InvalidLocation(_))
        ));
    }

    #[tokio::test]
    async fn observer_receives_structural_batches_only() {
        let document = Document::new("https://gitlab.com/group/app/-/merge_requests/7").unwrap();
        let body = document.body();
        let mut observer = document.observe(body, ObserverOptions::structural());
        assert_eq!(document.observer_count(), 1);

        let div = document.create_element("div");
        document.set_attribute(div, "class", "pending").unwrap();
        document.append_child(body, div).unwrap();

        let records = observer.next().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].added_nodes, vec![div]);

        drop(observer);
        assert_eq!(document.observer_count(), 0);
    }

    #[tokio::test]
    async fn mutate_publishes_one_batch() {
        let document = Document::new("https://gitlab.com/").unwrap();
        let body = document.body();
        let mut observer = document.observe(body, ObserverOptions::structural());

        let (outer, inner) = document
            .mutate(|m| {
                let outer = m.create_element("div");
                let inner = m.create_element("span");
                m.append_child(outer, inner)?;
                m.append_child(body, outer)?;
                Ok((outer, inner))
            })
            .unwrap();

        // `outer` was detached when `inner` joined it, so only the body
        // record falls under the observed root.
        let records = observer.next().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].added_nodes, vec![outer]);
        assert!(document.is_connected(inner));
    }

    #[tokio::test]
    async fn observer_sees_closed_document() {
        let document = Document::new("https://gitlab.com/").unwrap();
        let mut observer = document.observe(document.body(), ObserverOptions::structural());
        drop(document);
        assert_eq!(observer.next().await, Err(DomError::DocumentClosed));
    }

    #[test]
    fn probe_or_observe_only_subscribes_on_miss() {
        let document = Document::new("https://gitlab.com/").unwrap();
        let body = document.body();
        let selector = Selector::parse(".gl-button-group").unwrap();

        let missing = document.probe_or_observe(body, ObserverOptions::structural(), |tree| {
            tree.query_selector(&selector)
        });
        assert!(missing.is_err());
        assert_eq!(document.observer_count(), 1);
        drop(missing);

        let group = document.create_element("div");
        document.set_attribute(group, "class", "gl-button-group").unwrap();
        document.append_child(body, group).unwrap();

        let found = document.probe_or_observe(body, ObserverOptions::structural(), |tree| {
            tree.query_selector(&selector)
        });
        assert_eq!(found.ok(), Some(group));
        assert_eq!(document.observer_count(), 0);
    }

    #[test]
    fn disabled_elements_swallow_clicks() {
        let document = Document::new("https://gitlab.com/").unwrap();
        let button = document.create_element("button");
        document.append_child(document.body(), button).unwrap();

        let clicks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&clicks);
        document
            .add_click_listener(button, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        assert_eq!(
            document.dispatch_click(button).unwrap(),
            DispatchOutcome::Delivered(1)
        );
        document.set_disabled(button, true).unwrap();
        assert_eq!(
            document.dispatch_click(button).unwrap(),
            DispatchOutcome::Disabled
        );
        assert_eq!(clicks.load(Ordering::SeqCst), 1);
    }
}
