//! Mutation records and observers

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, trace};

use crate::errors::DomError;
use crate::tree::NodeId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    Attributes { name: String },
    CharacterData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeId,
    /// `target` followed by its ancestors at the time of the change.
    pub target_path: Vec<NodeId>,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
}

impl MutationRecord {
    pub fn is_within(&self, root: NodeId) -> bool {
        self.target_path.contains(&root)
    }
}

/// All records produced by one mutation call, published together.
#[derive(Debug, Clone)]
pub struct MutationBatch {
    pub sequence: u64,
    pub records: Vec<MutationRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObserverOptions {
    pub child_list: bool,
    pub subtree: bool,
    pub attributes: bool,
    pub character_data: bool,
}

impl ObserverOptions {
    /// Child-list changes anywhere under the root.
    pub fn structural() -> Self {
        Self {
            child_list: true,
            subtree: true,
            ..Self::default()
        }
    }

    pub fn accepts(&self, record: &MutationRecord, root: NodeId) -> bool {
        let kind_matches = match record.kind {
            MutationKind::ChildList => self.child_list,
            MutationKind::Attributes { .. } => self.attributes,
            MutationKind::CharacterData => self.character_data,
        };
        if !kind_matches {
            return false;
        }
        if self.subtree {
            record.is_within(root)
        } else {
            record.target == root
        }
    }
}

/// Subscription to a document's mutations under one root.
///
/// Dropping the observer (or calling [`MutationObserver::disconnect`])
/// unsubscribes it.
#[derive(Debug)]
pub struct MutationObserver {
    receiver: broadcast::Receiver<MutationBatch>,
    root: NodeId,
    options: ObserverOptions,
}

impl MutationObserver {
    pub(crate) fn new(
        receiver: broadcast::Receiver<MutationBatch>,
        root: NodeId,
        options: ObserverOptions,
    ) -> Self {
        Self {
            receiver,
            root,
            options,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn options(&self) -> ObserverOptions {
        self.options
    }

    /// Waits for the next batch containing at least one relevant record.
    ///
    /// An empty vector means batches were dropped because this observer
    /// fell behind; callers should re-inspect the document.
    pub async fn next(&mut self) -> Result<Vec<MutationRecord>, DomError> {
        loop {
            match self.receiver.recv().await {
                Ok(batch) => {
                    let relevant: Vec<MutationRecord> = batch
                        .records
                        .into_iter()
                        .filter(|record| self.options.accepts(record, self.root))
                        .collect();
                    if relevant.is_empty() {
                        trace!(sequence = batch.sequence, "Skipping unrelated mutations");
                        continue;
                    }
                    return Ok(relevant);
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, root = %self.root, "Observer lagged behind mutations");
                    return Ok(Vec::new());
                }
                Err(RecvError::Closed) => return Err(DomError::DocumentClosed),
            }
        }
    }

    pub fn disconnect(self) {
        trace!(root = %self.root, "Observer disconnected");
    }
}
