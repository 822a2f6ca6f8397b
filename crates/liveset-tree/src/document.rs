//! The arena document and its node access layer.
//!
//! [`Document`] owns every node in a flat arena addressed by [`NodeId`].
//! Detaching a node only unlinks it from its parent; the node and its
//! subtree stay in the arena and can be re-attached anywhere else in the
//! same document. Ids are never reused, so an id held by a caller stays
//! valid for the lifetime of the document.
//!
//! # Invariants
//!
//! - `NodeId(0)` is always the document root (kind [`NodeKind::Document`]).
//! - A node appears in at most one parent's child list, and its `parent`
//!   field points back at that parent.
//! - The parent relation is acyclic.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TreeError, TreeResult};

/// Stable index of a node inside a [`Document`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    /// The raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single `name="value"` pair on an element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An element: a tag name and its attributes in source order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

/// What a node is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// The document root, or a detached fragment wrapper.
    Document,
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
}

#[derive(Clone, Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// An XML document held as an arena of nodes.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new(NodeKind::Document)],
        }
    }

    /// The document root node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes in the arena, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the document holds nothing but its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// The first element child of the root (`<Ableton>` for a Live set).
    pub fn document_element(&self) -> Option<NodeId> {
        self.first_element_child(self.root())
    }

    // ---------------------------------------------------------------
    // Node inspection
    // ---------------------------------------------------------------

    fn data(&self, id: NodeId) -> TreeResult<&NodeData> {
        self.nodes.get(id.0).ok_or(TreeError::UnknownNode(id))
    }

    fn data_mut(&mut self, id: NodeId) -> TreeResult<&mut NodeData> {
        self.nodes.get_mut(id.0).ok_or(TreeError::UnknownNode(id))
    }

    fn element_mut(&mut self, id: NodeId) -> TreeResult<&mut Element> {
        match &mut self.data_mut(id)?.kind {
            NodeKind::Element(element) => Ok(element),
            _ => Err(TreeError::NotAnElement(id)),
        }
    }

    /// Returns `true` if `id` refers to a node in this arena.
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|n| &n.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id)? {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn is_document(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Document))
    }

    /// Whether children can be appended to this node.
    pub fn accepts_children(&self, id: NodeId) -> bool {
        matches!(
            self.kind(id),
            Some(NodeKind::Document) | Some(NodeKind::Element(_))
        )
    }

    /// The element's tag name, or `None` for non-element nodes.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    /// Child ids in document order. Unknown ids have no children.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.element_children(id).next()
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |c| self.is_element(*c))
    }

    /// All descendants of `id` in document (pre-)order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Returns `true` if `ancestor` lies on the parent chain of `id`
    /// (or is `id` itself).
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    // ---------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attribute(name)
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    /// Attributes in source order; empty for non-element nodes.
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.element(id)
            .map(|e| e.attributes.as_slice())
            .unwrap_or(&[])
    }

    /// Read an attribute as an integer.
    ///
    /// Returns `Ok(None)` when the attribute is absent and
    /// [`TreeError::InvalidNumber`] when it is present but not an integer.
    pub fn attribute_i64(&self, id: NodeId, name: &str) -> TreeResult<Option<i64>> {
        match self.attribute(id, name) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| TreeError::InvalidNumber {
                    node: id,
                    name: name.to_string(),
                    value: raw.to_string(),
                }),
        }
    }

    /// Set an attribute, replacing the value in place if it already exists
    /// so attribute order is preserved.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> TreeResult<()> {
        let value = value.into();
        let element = self.element_mut(id)?;
        match element.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => element.attributes.push(Attribute::new(name, value)),
        }
        Ok(())
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> TreeResult<Option<String>> {
        let element = self.element_mut(id)?;
        let position = element.attributes.iter().position(|a| a.name == name);
        Ok(position.map(|i| element.attributes.remove(i).value))
    }

    // ---------------------------------------------------------------
    // Construction and structural mutation
    // ---------------------------------------------------------------

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData::new(kind));
        id
    }

    /// Create a detached element.
    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Element(Element::new(name)))
    }

    /// Create a detached element with the given attributes.
    pub fn create_element_with(
        &mut self,
        name: impl Into<String>,
        attributes: impl IntoIterator<Item = (String, String)>,
    ) -> NodeId {
        let mut element = Element::new(name);
        element.attributes = attributes
            .into_iter()
            .map(|(name, value)| Attribute::new(name, value))
            .collect();
        self.push_node(NodeKind::Element(element))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Text(text.into()))
    }

    /// Create a detached document-kind node that can wrap a fragment.
    pub fn create_fragment(&mut self) -> NodeId {
        self.push_node(NodeKind::Document)
    }

    pub(crate) fn create_node(&mut self, kind: NodeKind) -> NodeId {
        self.push_node(kind)
    }

    /// Unlink a node from its parent. The subtree stays in the arena.
    pub fn detach(&mut self, id: NodeId) -> TreeResult<()> {
        let Some(parent) = self.data(id)?.parent else {
            return Ok(());
        };
        self.data_mut(parent)?.children.retain(|c| *c != id);
        self.data_mut(id)?.parent = None;
        Ok(())
    }

    /// Append `child` as the last child of `parent`, detaching it from any
    /// previous parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        self.data(child)?;
        if !self.accepts_children(parent) {
            return Err(if self.contains(parent) {
                TreeError::NotAnElement(parent)
            } else {
                TreeError::UnknownNode(parent)
            });
        }
        if child == self.root() || self.is_ancestor_or_self(child, parent) {
            return Err(TreeError::Cycle { parent, child });
        }
        self.detach(child)?;
        self.data_mut(parent)?.children.push(child);
        self.data_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Remove `child` from `parent`'s children.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        if self.data(child)?.parent != Some(parent) {
            return Err(TreeError::NotAChild { parent, child });
        }
        self.detach(child)
    }

    /// Detach every child of `parent`, returning them in their former order.
    pub fn remove_all_children(&mut self, parent: NodeId) -> TreeResult<Vec<NodeId>> {
        let removed = std::mem::take(&mut self.data_mut(parent)?.children);
        for child in &removed {
            self.data_mut(*child)?.parent = None;
        }
        Ok(removed)
    }

    /// Deep-copy a subtree of `source` into this arena.
    ///
    /// The copy is returned detached. Copying a document-kind node yields a
    /// detached fragment wrapper holding copies of its children.
    pub fn import(&mut self, source: &Document, node: NodeId) -> TreeResult<NodeId> {
        let kind = source.data(node)?.kind.clone();
        let copy = self.push_node(kind);
        let mut pending = vec![(node, copy)];
        while let Some((from, to)) = pending.pop() {
            for child in source.children(from) {
                let child_copy = self.push_node(source.data(*child)?.kind.clone());
                self.data_mut(to)?.children.push(child_copy);
                self.data_mut(child_copy)?.parent = Some(to);
                pending.push((*child, child_copy));
            }
        }
        Ok(copy)
    }
}
