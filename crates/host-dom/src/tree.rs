//! Arena-backed element tree

use std::collections::BTreeMap;
use std::fmt;

use crate::errors::DomError;
use crate::mutation::{MutationKind, MutationRecord};
use crate::selector::{Combinator, Selector, SelectorPart, SelectorStep};

/// Handle to an element inside one [`crate::Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    attributes: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    text: String,
    disabled: bool,
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    element: ElementData,
}

/// Element tree rooted at `body`. Read access is handed out by
/// [`crate::Document::read`]; writes go through [`crate::Mutator`].
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    body: NodeId,
}

impl Tree {
    pub(crate) fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            body: NodeId(0),
        };
        tree.body = tree.create_element("body");
        tree
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub(crate) fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            element: ElementData {
                tag: tag.to_ascii_lowercase(),
                attributes: BTreeMap::new(),
                style: BTreeMap::new(),
                text: String::new(),
                disabled: false,
            },
        });
        id
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes.get_mut(id.0).ok_or(DomError::UnknownNode(id))
    }

    pub fn exists(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.0).map(|node| node.element.tag.as_str())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes
            .get(id.0)
            .and_then(|node| node.element.attributes.get(name))
            .map(String::as_str)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.0).map(|node| node.element.text.as_str())
    }

    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.nodes
            .get(id.0)
            .and_then(|node| node.element.style.get(property))
            .map(String::as_str)
    }

    pub fn is_disabled(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.0)
            .map(|node| node.element.disabled)
            .unwrap_or(false)
    }

    fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attribute(id, "class")
            .map(|value| value.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// `node` itself followed by its ancestors up to the topmost one.
    pub fn ancestry(&self, node: NodeId) -> Vec<NodeId> {
        let mut path = vec![node];
        let mut cursor = self.parent(node);
        while let Some(parent) = cursor {
            path.push(parent);
            cursor = self.parent(parent);
        }
        path
    }

    /// Inclusive: a node contains itself.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.body, node)
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        let mut found = None;
        self.walk(self.body, true, &mut |node| {
            if self.attribute(node, "id") == Some(id) {
                found = Some(node);
                return false;
            }
            true
        });
        found
    }

    /// First element in document order under `root` matching `selector`.
    /// `root` itself is a candidate only when `include_root` is set.
    pub fn query_selector_from(
        &self,
        root: NodeId,
        selector: &Selector,
        include_root: bool,
    ) -> Option<NodeId> {
        if !self.exists(root) {
            return None;
        }
        let mut found = None;
        self.walk(root, include_root, &mut |node| {
            if self.matches(node, selector) {
                found = Some(node);
                return false;
            }
            true
        });
        found
    }

    /// Every match under `root` (excluding `root`) in document order.
    pub fn query_selector_all_from(&self, root: NodeId, selector: &Selector) -> Vec<NodeId> {
        let mut found = Vec::new();
        if self.exists(root) {
            self.walk(root, false, &mut |node| {
                if self.matches(node, selector) {
                    found.push(node);
                }
                true
            });
        }
        found
    }

    pub fn query_selector(&self, selector: &Selector) -> Option<NodeId> {
        self.query_selector_from(self.body, selector, true)
    }

    pub fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        selector
            .groups()
            .iter()
            .any(|parts| self.matches_chain(node, parts))
    }

    // Depth-first pre-order walk; the visitor returns false to stop.
    fn walk(&self, root: NodeId, include_root: bool, visit: &mut dyn FnMut(NodeId) -> bool) {
        let mut stack: Vec<NodeId> = if include_root {
            vec![root]
        } else {
            self.children(root).iter().rev().copied().collect()
        };
        while let Some(node) = stack.pop() {
            if !visit(node) {
                return;
            }
            stack.extend(self.children(node).iter().rev().copied());
        }
    }

    fn matches_chain(&self, node: NodeId, parts: &[SelectorPart]) -> bool {
        let Some((last, rest)) = parts.split_last() else {
            return false;
        };
        if !self.matches_step(node, &last.step) {
            return false;
        }
        if rest.is_empty() {
            return true;
        }

        match last.combinator.unwrap_or(Combinator::Descendant) {
            Combinator::Child => self
                .parent(node)
                .is_some_and(|parent| self.matches_chain(parent, rest)),
            Combinator::Descendant => {
                let mut cursor = self.parent(node);
                while let Some(ancestor) = cursor {
                    if self.matches_chain(ancestor, rest) {
                        return true;
                    }
                    cursor = self.parent(ancestor);
                }
                false
            }
            Combinator::AdjacentSibling => self
                .previous_sibling(node)
                .is_some_and(|sibling| self.matches_chain(sibling, rest)),
            Combinator::GeneralSibling => {
                let mut cursor = self.previous_sibling(node);
                while let Some(sibling) = cursor {
                    if self.matches_chain(sibling, rest) {
                        return true;
                    }
                    cursor = self.previous_sibling(sibling);
                }
                false
            }
        }
    }

    fn matches_step(&self, node: NodeId, step: &SelectorStep) -> bool {
        let Some(data) = self.nodes.get(node.0).map(|n| &n.element) else {
            return false;
        };
        if let Some(tag) = &step.tag {
            if &data.tag != tag {
                return false;
            }
        }
        if let Some(id) = &step.id {
            if data.attributes.get("id") != Some(id) {
                return false;
            }
        }
        if !step.classes.iter().all(|class| self.has_class(node, class)) {
            return false;
        }
        step.attrs.iter().all(|cond| {
            let value = if cond.name == "disabled" && data.disabled {
                Some("")
            } else {
                data.attributes.get(&cond.name).map(String::as_str)
            };
            match (&cond.value, value) {
                (None, Some(_)) => true,
                (Some(expected), Some(actual)) => expected == actual,
                (_, None) => false,
            }
        })
    }

    fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&child| child == node)?;
        index.checked_sub(1).map(|prev| siblings[prev])
    }

    fn child_list_record(
        &self,
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    ) -> MutationRecord {
        MutationRecord {
            kind: MutationKind::ChildList,
            target,
            target_path: self.ancestry(target),
            added_nodes: added,
            removed_nodes: removed,
        }
    }

    fn attribute_record(&self, target: NodeId, name: &str) -> MutationRecord {
        MutationRecord {
            kind: MutationKind::Attributes {
                name: name.to_string(),
            },
            target,
            target_path: self.ancestry(target),
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
        }
    }

    pub(crate) fn append_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
    ) -> Result<Vec<MutationRecord>, DomError> {
        self.node(parent)?;
        self.node(child)?;
        if child == self.body {
            return Err(DomError::Hierarchy("body cannot be re-parented".into()));
        }
        if self.contains(child, parent) {
            return Err(DomError::Hierarchy(format!(
                "{child} is an ancestor of {parent}"
            )));
        }

        let mut records = Vec::new();
        if let Some(previous) = self.parent(child) {
            records.push(self.remove_child(previous, child)?);
        }
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        records.push(self.child_list_record(parent, vec![child], Vec::new()));
        Ok(records)
    }

    pub(crate) fn remove_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
    ) -> Result<MutationRecord, DomError> {
        self.node(child)?;
        let siblings = &mut self.node_mut(parent)?.children;
        let index = siblings
            .iter()
            .position(|&c| c == child)
            .ok_or(DomError::NotAChild { parent, child })?;
        siblings.remove(index);
        self.node_mut(child)?.parent = None;
        Ok(self.child_list_record(parent, Vec::new(), vec![child]))
    }

    pub(crate) fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: &str,
    ) -> Result<MutationRecord, DomError> {
        let name = name.to_ascii_lowercase();
        self.node_mut(node)?
            .element
            .attributes
            .insert(name.clone(), value.to_string());
        Ok(self.attribute_record(node, &name))
    }

    pub(crate) fn set_style(
        &mut self,
        node: NodeId,
        property: &str,
        value: &str,
    ) -> Result<MutationRecord, DomError> {
        self.node_mut(node)?
            .element
            .style
            .insert(property.to_string(), value.to_string());
        Ok(self.attribute_record(node, "style"))
    }

    pub(crate) fn set_disabled(
        &mut self,
        node: NodeId,
        disabled: bool,
    ) -> Result<MutationRecord, DomError> {
        self.node_mut(node)?.element.disabled = disabled;
        Ok(self.attribute_record(node, "disabled"))
    }

    pub(crate) fn set_text(&mut self, node: NodeId, text: &str) -> Result<MutationRecord, DomError> {
        self.node_mut(node)?.element.text = text.to_string();
        Ok(MutationRecord {
            kind: MutationKind::CharacterData,
            target: node,
            target_path: self.ancestry(node),
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tree: &mut Tree, parent: NodeId, tag: &str, class: Option<&str>) -> NodeId {
        let node = tree.create_element(tag);
        if let Some(class) = class {
            tree.set_attribute(node, "class", class).unwrap();
        }
        tree.append_child(parent, node).unwrap();
        node
    }

    fn sel(source: &str) -> Selector {
        Selector::parse(source).unwrap()
    }

    #[test]
    fn adjacent_sibling_requires_immediate_predecessor() {
        let mut tree = Tree::new();
        let body = tree.body();
        let state = element(&mut tree, body, "div", Some("mr-state-container"));
        let target = element(&mut tree, body, "div", None);
        let later = element(&mut tree, body, "div", None);

        let selector = sel(".mr-state-container + div");
        assert!(tree.matches(target, &selector));
        assert!(!tree.matches(later, &selector));
        assert!(!tree.matches(state, &selector));
        assert_eq!(tree.query_selector(&selector), Some(target));
    }

    #[test]
    fn descendant_and_child_combinators() {
        let mut tree = Tree::new();
        let body = tree.body();
        let section = element(&mut tree, body, "section", Some("mr"));
        let wrapper = element(&mut tree, section, "div", None);
        let button = element(&mut tree, wrapper, "button", Some("btn gl-button"));

        assert!(tree.matches(button, &sel(".mr button")));
        assert!(tree.matches(button, &sel("div > .gl-button")));
        assert!(!tree.matches(button, &sel("section > button")));
        assert!(tree.matches(button, &sel("body .mr div > button.btn")));
    }

    #[test]
    fn query_from_root_excludes_root_unless_requested() {
        let mut tree = Tree::new();
        let body = tree.body();
        let group = element(&mut tree, body, "div", Some("group"));
        let inner = element(&mut tree, group, "div", Some("group"));

        assert_eq!(tree.query_selector_from(group, &sel(".group"), false), Some(inner));
        assert_eq!(tree.query_selector_from(group, &sel(".group"), true), Some(group));
    }

    #[test]
    fn get_element_by_id_ignores_detached_nodes() {
        let mut tree = Tree::new();
        let detached = tree.create_element("button");
        tree.set_attribute(detached, "id", "ai-code-review-button")
            .unwrap();
        assert_eq!(tree.get_element_by_id("ai-code-review-button"), None);

        let body = tree.body();
        tree.append_child(body, detached).unwrap();
        assert_eq!(
            tree.get_element_by_id("ai-code-review-button"),
            Some(detached)
        );
    }

    #[test]
    fn append_rejects_cycles_and_moves_existing_children() {
        let mut tree = Tree::new();
        let body = tree.body();
        let a = element(&mut tree, body, "div", None);
        let b = element(&mut tree, a, "div", None);

        assert!(matches!(
            tree.append_child(b, a),
            Err(DomError::Hierarchy(_))
        ));

        let records = tree.append_child(body, b).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].removed_nodes, vec![b]);
        assert_eq!(records[1].added_nodes, vec![b]);
        assert_eq!(tree.parent(b), Some(body));
        assert!(tree.children(a).is_empty());
    }

    #[test]
    fn disabled_flag_matches_attribute_selector() {
        let mut tree = Tree::new();
        let body = tree.body();
        let button = element(&mut tree, body, "button", None);
        assert!(!tree.matches(button, &sel("button[disabled]")));
        tree.set_disabled(button, true).unwrap();
        assert!(tree.matches(button, &sel("button[disabled]")));
    }
}
