// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph framework.

use crate::connection::ConnectionId;
use crate::kinds::{NodeBehavior, NodeContent, NodeKind, PayloadError};
use crate::port::{DataType, Port, PortDirection, PortId, PortValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic ID counters owned by a graph.
///
/// Counters only ever move forward, so an ID handed out once is never
/// handed out again by the same allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    next_node: u32,
    next_port: u32,
    next_connection: u32,
}

impl IdAllocator {
    /// Create an allocator whose first node and port IDs are 1
    pub fn new() -> Self {
        Self {
            next_node: 1,
            next_port: 1,
            next_connection: 1,
        }
    }

    /// Mint a node ID
    pub fn node(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node = self.next_node.saturating_add(1);
        id
    }

    /// Mint a port ID
    pub fn port(&mut self) -> PortId {
        let id = PortId(self.next_port);
        self.next_port = self.next_port.saturating_add(1);
        id
    }

    /// Mint a connection ID
    pub fn connection(&mut self) -> ConnectionId {
        let id = ConnectionId(self.next_connection);
        self.next_connection = self.next_connection.saturating_add(1);
        id
    }

    /// The node ID the next call to [`node`](Self::node) returns
    pub fn peek_node(&self) -> NodeId {
        NodeId(self.next_node)
    }

    /// The port ID the next call to [`port`](Self::port) returns
    pub fn peek_port(&self) -> PortId {
        PortId(self.next_port)
    }

    /// Make sure future IDs are strictly greater than the given ones
    pub fn advance_past(&mut self, node: Option<NodeId>, port: Option<PortId>) {
        if let Some(NodeId(id)) = node {
            self.next_node = self.next_node.max(id.saturating_add(1));
        }
        if let Some(PortId(id)) = port {
            self.next_port = self.next_port.max(id.saturating_add(1));
        }
    }

    /// Take the larger of each counter
    pub fn merge(&mut self, other: &IdAllocator) {
        self.next_node = self.next_node.max(other.next_node);
        self.next_port = self.next_port.max(other.next_port);
        self.next_connection = self.next_connection.max(other.next_connection);
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects the port declarations of a node while it is being built.
///
/// A builder only exists inside [`Node::from_content`], so ports cannot be
/// added to a node after construction.
pub struct PortBuilder<'a> {
    node: NodeId,
    ids: &'a mut IdAllocator,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
}

impl<'a> PortBuilder<'a> {
    fn new(node: NodeId, ids: &'a mut IdAllocator) -> Self {
        Self {
            node,
            ids,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Declare the next input port
    pub fn add_input(&mut self, name: &str, data_type: DataType) -> &mut Self {
        let id = self.ids.port();
        self.inputs
            .push(Port::new(id, name, data_type, PortDirection::Input, self.node));
        self
    }

    /// Declare the next output port
    pub fn add_output(&mut self, name: &str, data_type: DataType) -> &mut Self {
        let id = self.ids.port();
        self.outputs
            .push(Port::new(id, name, data_type, PortDirection::Output, self.node));
        self
    }
}

/// A node instance in the graph
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    title: String,
    /// Position on the canvas; opaque to the engine
    pub position: [f32; 2],
    /// Size on the canvas; opaque to the engine
    pub size: [f32; 2],
    inputs: Vec<Port>,
    outputs: Vec<Port>,
    content: NodeContent,
}

impl Node {
    /// Create a node of the given kind with default content.
    ///
    /// This is also the form the loader uses before patching persisted IDs in.
    pub fn new(kind: NodeKind, position: [f32; 2], ids: &mut IdAllocator) -> Self {
        Self::from_content(NodeContent::new(kind), position, ids)
    }

    /// Create a node around existing content
    pub fn from_content(content: NodeContent, position: [f32; 2], ids: &mut IdAllocator) -> Self {
        let id = ids.node();
        let mut ports = PortBuilder::new(id, ids);
        content.declare_ports(&mut ports);
        let PortBuilder {
            inputs, outputs, ..
        } = ports;

        let kind = content.kind();
        Self {
            id,
            title: kind.default_title().to_string(),
            position,
            size: kind.default_size(),
            inputs,
            outputs,
            content,
        }
    }

    /// Node ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Kind tag
    pub fn kind(&self) -> NodeKind {
        self.content.kind()
    }

    /// Display title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Set the display title. Line breaks are flattened to spaces.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into().replace(['\r', '\n'], " ");
    }

    /// Input ports in declaration order
    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }

    /// Output ports in declaration order
    pub fn outputs(&self) -> &[Port] {
        &self.outputs
    }

    /// Get an input port by index
    pub fn input(&self, index: usize) -> Option<&Port> {
        self.inputs.get(index)
    }

    /// Get an output port by index
    pub fn output(&self, index: usize) -> Option<&Port> {
        self.outputs.get(index)
    }

    /// Get a port by ID
    pub fn port(&self, port_id: PortId) -> Option<&Port> {
        self.ports().find(|p| p.id() == port_id)
    }

    /// Get all ports, inputs first
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// A root node declares no inputs at all
    pub fn is_root(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Kind-specific state
    pub fn content(&self) -> &NodeContent {
        &self.content
    }

    /// Mutable kind-specific state
    pub fn content_mut(&mut self) -> &mut NodeContent {
        &mut self.content
    }

    /// Kind-specific payload for persistence
    pub fn data(&self) -> Option<String> {
        self.content.data()
    }

    /// Restore the kind-specific payload
    pub fn set_data(&mut self, data: &str) -> Result<(), PayloadError> {
        self.content.set_data(data)
    }

    pub(crate) fn port_mut(&mut self, port_id: PortId) -> Option<&mut Port> {
        self.inputs
            .iter_mut()
            .chain(self.outputs.iter_mut())
            .find(|p| p.id() == port_id)
    }

    pub(crate) fn inputs_mut(&mut self) -> &mut [Port] {
        &mut self.inputs
    }

    pub(crate) fn outputs_mut(&mut self) -> &mut [Port] {
        &mut self.outputs
    }

    pub(crate) fn set_id(&mut self, id: NodeId) {
        self.id = id;
        for port in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            port.set_node(id);
        }
    }

    /// Current value of an output port, `None` if nothing was produced yet
    pub(crate) fn read_output(&self, port_id: PortId) -> Option<PortValue> {
        let index = self.outputs.iter().position(|p| p.id() == port_id)?;
        self.content.output(index)
    }

    /// Hand a value to an input port's setter
    pub(crate) fn write_input(&mut self, port_id: PortId, value: Option<PortValue>) {
        if let Some(index) = self.inputs.iter().position(|p| p.id() == port_id) {
            self.content.set_input(index, value);
        }
    }

    pub(crate) fn run_process_hook(&mut self) {
        self.content.process();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_is_monotonic() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.node(), NodeId(1));
        assert_eq!(ids.node(), NodeId(2));
        assert_eq!(ids.port(), PortId(1));

        ids.advance_past(Some(NodeId(10)), Some(PortId(50)));
        assert_eq!(ids.node(), NodeId(11));
        assert_eq!(ids.port(), PortId(51));

        // Never regresses
        ids.advance_past(Some(NodeId(3)), Some(PortId(3)));
        assert_eq!(ids.peek_node(), NodeId(12));
        assert_eq!(ids.peek_port(), PortId(52));
    }

    #[test]
    fn test_ports_follow_declaration_order() {
        let mut ids = IdAllocator::new();
        let node = Node::new(NodeKind::Label, [0.0, 0.0], &mut ids);

        assert_eq!(node.id(), NodeId(1));
        assert_eq!(node.inputs().len(), 1);
        assert_eq!(node.outputs().len(), 1);
        assert_eq!(node.inputs()[0].name(), "Input");
        assert_eq!(node.outputs()[0].name(), "Output");
        assert!(node.inputs()[0].id() < node.outputs()[0].id());
        assert!(node.ports().all(|p| p.node() == node.id()));
        assert!(!node.is_root());
    }

    #[test]
    fn test_same_kind_builds_same_port_shape() {
        let mut ids = IdAllocator::new();
        for kind in NodeKind::ALL {
            let a = Node::new(kind, [0.0, 0.0], &mut ids);
            let b = Node::new(kind, [5.0, 5.0], &mut ids);
            let shape = |n: &Node| {
                n.ports()
                    .map(|p| (p.name().to_string(), p.data_type(), p.direction()))
                    .collect::<Vec<_>>()
            };
            assert_eq!(shape(&a), shape(&b), "{kind}");
        }
    }

    #[test]
    fn test_set_title_flattens_newlines() {
        let mut ids = IdAllocator::new();
        let mut node = Node::new(NodeKind::TextInput, [0.0, 0.0], &mut ids);
        assert_eq!(node.title(), "Text Input Node");
        node.set_title("two\nlines");
        assert_eq!(node.title(), "two lines");
    }

    #[test]
    fn test_set_id_rewrites_port_owners() {
        let mut ids = IdAllocator::new();
        let mut node = Node::new(NodeKind::LoadImage, [0.0, 0.0], &mut ids);
        node.set_id(NodeId(42));
        assert!(node.ports().all(|p| p.node() == NodeId(42)));
    }
}
