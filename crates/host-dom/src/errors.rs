//! Error types for the host document

use thiserror::Error;

use crate::tree::NodeId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    /// Selector syntax outside the supported subset
    #[error("Unsupported selector: {0}")]
    UnsupportedSelector(String),

    /// Node id does not belong to this document
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// `remove_child` called with a node that is not a child of `parent`
    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    /// Insertion would create a cycle or move the root
    #[error("Hierarchy request error: {0}")]
    Hierarchy(String),

    /// Page location could not be parsed as a URL
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    /// The document was torn down while an observer was waiting
    #[error("Document closed")]
    DocumentClosed,
}
