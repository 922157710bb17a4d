// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and connections.
//!
//! The graph owns every node and every connection. Connections live in an
//! arena keyed by [`ConnectionId`]; ports only hold the IDs of the
//! connections that touch them, so removing an edge is a lookup plus a
//! filter on both endpoints.

use crate::connection::{Connection, ConnectionId, PortRef};
use crate::evaluation::ExecutionLimits;
use crate::interaction::LinkState;
use crate::kinds::{NodeContent, NodeKind};
use crate::node::{IdAllocator, Node, NodeId};
use crate::port::{Port, PortDirection, PortId};
use indexmap::IndexMap;

/// A dataflow graph
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Nodes in insertion order
    nodes: IndexMap<NodeId, Node>,
    /// Connections in the order they were made
    connections: IndexMap<ConnectionId, Connection>,
    /// ID counters for everything this graph creates
    pub(crate) ids: IdAllocator,
    /// Click-to-connect state
    pub(crate) link_state: LinkState,
    /// Bounds applied by [`Graph::execute`]
    limits: ExecutionLimits,
}

impl Graph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty graph with custom execution limits
    pub fn with_limits(limits: ExecutionLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// Execution limits
    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    /// Replace the execution limits
    pub fn set_limits(&mut self, limits: ExecutionLimits) {
        self.limits = limits;
    }

    /// ID counters
    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    /// Create a node of the given kind and add it
    pub fn add_node(&mut self, kind: NodeKind, position: [f32; 2]) -> NodeId {
        let node = Node::new(kind, position, &mut self.ids);
        self.insert_node(node)
    }

    /// Create a node around prepared content and add it
    pub fn add_content(&mut self, content: NodeContent, position: [f32; 2]) -> NodeId {
        let node = Node::from_content(content, position, &mut self.ids);
        self.insert_node(node)
    }

    pub(crate) fn insert_node(&mut self, node: Node) -> NodeId {
        let id = node.id();
        tracing::debug!("Added {} node {}", node.kind(), id);
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node, severing its connections first
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let touching: Vec<ConnectionId> = self
            .nodes
            .get(&node_id)?
            .ports()
            .flat_map(Port::connections)
            .collect();
        for connection_id in touching {
            self.disconnect(connection_id);
        }

        if matches!(self.link_state, LinkState::ArmedFrom(armed) if armed.node == node_id) {
            self.link_state = LinkState::Idle;
        }

        tracing::debug!("Removed node {}", node_id);
        self.nodes.shift_remove(&node_id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Get all nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes that declare no input ports
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.values().filter(|n| n.is_root()).map(Node::id)
    }

    /// Look up a port through its owning node
    pub fn port(&self, port: PortRef) -> Option<&Port> {
        self.nodes.get(&port.node)?.port(port.port)
    }

    pub(crate) fn port_mut(&mut self, port: PortRef) -> Option<&mut Port> {
        self.nodes.get_mut(&port.node)?.port_mut(port.port)
    }

    /// Connect two ports given in either order.
    ///
    /// The output end becomes the source. If the input end already has an
    /// upstream connection, that connection is replaced.
    pub fn connect(&mut self, a: PortRef, b: PortRef) -> Result<ConnectionId, ConnectionError> {
        let first = self.resolve(a)?;
        let second = self.resolve(b)?;

        if !first.can_connect(second) {
            return Err(ConnectionError::IncompatiblePorts {
                first: a.port,
                second: b.port,
            });
        }

        let (output, input) = if first.direction() == PortDirection::Output {
            (a, b)
        } else {
            (b, a)
        };
        Ok(self.commit(output, input))
    }

    fn resolve(&self, port: PortRef) -> Result<&Port, ConnectionError> {
        let node = self
            .nodes
            .get(&port.node)
            .ok_or(ConnectionError::NodeNotFound(port.node))?;
        node.port(port.port)
            .ok_or(ConnectionError::PortNotFound(port.port))
    }

    /// Create `output -> input` without checking compatibility
    pub(crate) fn commit(&mut self, output: PortRef, input: PortRef) -> ConnectionId {
        // Single writer per input
        if let Some(existing) = self.port(input).and_then(Port::connected_from) {
            tracing::debug!("Replacing connection {} into port {}", existing, input.port);
            self.disconnect(existing);
        }

        let id = self.ids.connection();
        self.connections
            .insert(id, Connection::new(id, output, input));
        if let Some(port) = self.port_mut(output) {
            port.attach(id);
        }
        if let Some(port) = self.port_mut(input) {
            port.attach(id);
        }

        tracing::debug!(
            "Connected port {} (node {}) -> port {} (node {})",
            output.port,
            output.node,
            input.port,
            input.node
        );
        id
    }

    /// Remove a connection
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        let connection = self.connections.shift_remove(&connection_id)?;
        if let Some(port) = self.port_mut(connection.from()) {
            port.detach(connection_id);
        }
        if let Some(port) = self.port_mut(connection.to()) {
            port.detach(connection_id);
        }
        Some(connection)
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Get all connections in the order they were made
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Fan-out of an output port, in the order the connections were made
    pub fn connections_from(&self, port: PortRef) -> impl Iterator<Item = &Connection> {
        self.port(port)
            .map(Port::connected_to)
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.connections.get(id))
    }

    /// The connection feeding an input port
    pub fn connection_to(&self, port: PortRef) -> Option<&Connection> {
        let id = self.port(port)?.connected_from()?;
        self.connections.get(&id)
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections
            .values()
            .filter(move |c| c.involves_node(node_id))
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

/// Error when creating a connection
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(PortId),

    /// Types differ, or both ports point the same way
    #[error("Ports {first} and {second} are not compatible")]
    IncompatiblePorts {
        /// First port given
        first: PortId,
        /// Second port given
        second: PortId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::TextInput;

    fn out_ref(graph: &Graph, node: NodeId) -> PortRef {
        PortRef::new(node, graph.node(node).unwrap().outputs()[0].id())
    }

    fn in_ref(graph: &Graph, node: NodeId) -> PortRef {
        PortRef::new(node, graph.node(node).unwrap().inputs()[0].id())
    }

    #[test]
    fn test_connect_is_order_independent() {
        let mut a = Graph::new();
        let src = a.add_node(NodeKind::TextInput, [0.0, 0.0]);
        let dst = a.add_node(NodeKind::Label, [200.0, 0.0]);
        let mut b = a.clone();

        let forward = a.connect(out_ref(&a, src), in_ref(&a, dst)).unwrap();
        let backward = b.connect(in_ref(&b, dst), out_ref(&b, src)).unwrap();

        let fa = a.connection(forward).unwrap();
        let fb = b.connection(backward).unwrap();
        assert_eq!(fa.tuple(), fb.tuple());
        assert_eq!(fa.from_node, src);
        assert_eq!(fa.to_node, dst);
    }

    #[test]
    fn test_second_writer_replaces_first() {
        let mut graph = Graph::new();
        let first = graph.add_node(NodeKind::TextInput, [0.0, 0.0]);
        let second = graph.add_node(NodeKind::Path, [0.0, 100.0]);
        let label = graph.add_node(NodeKind::Label, [200.0, 0.0]);

        let old = graph
            .connect(out_ref(&graph, first), in_ref(&graph, label))
            .unwrap();
        assert_eq!(graph.connection_count(), 1);

        let new = graph
            .connect(out_ref(&graph, second), in_ref(&graph, label))
            .unwrap();
        assert_eq!(graph.connection_count(), 1);
        assert!(graph.connection(old).is_none());
        assert!(graph.port(out_ref(&graph, first)).unwrap().connected_to().is_empty());
        assert_eq!(
            graph.port(out_ref(&graph, second)).unwrap().connected_to(),
            &[new]
        );
        assert_eq!(
            graph.connection_to(in_ref(&graph, label)).map(|c| c.id),
            Some(new)
        );
    }

    #[test]
    fn test_incompatible_types_rejected() {
        let mut graph = Graph::new();
        let text = graph.add_node(NodeKind::TextInput, [0.0, 0.0]);
        let video = graph.add_node(NodeKind::VideoInput, [0.0, 0.0]);
        let loader = graph.add_node(NodeKind::LoadImage, [0.0, 0.0]);

        // Image output into String input
        let err = graph
            .connect(out_ref(&graph, video), in_ref(&graph, loader))
            .unwrap_err();
        assert!(matches!(err, ConnectionError::IncompatiblePorts { .. }));

        // Output to output
        let err = graph
            .connect(out_ref(&graph, text), out_ref(&graph, video))
            .unwrap_err();
        assert!(matches!(err, ConnectionError::IncompatiblePorts { .. }));
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn test_connect_unknown_port() {
        let mut graph = Graph::new();
        let text = graph.add_node(NodeKind::TextInput, [0.0, 0.0]);
        let err = graph
            .connect(out_ref(&graph, text), PortRef::new(NodeId(99), PortId(1)))
            .unwrap_err();
        assert!(matches!(err, ConnectionError::NodeNotFound(NodeId(99))));

        let err = graph
            .connect(out_ref(&graph, text), PortRef::new(text, PortId(99)))
            .unwrap_err();
        assert!(matches!(err, ConnectionError::PortNotFound(PortId(99))));
    }

    #[test]
    fn test_fan_out_keeps_order() {
        let mut graph = Graph::new();
        let src = graph.add_content(NodeContent::TextInput(TextInput::new("x")), [0.0, 0.0]);
        let labels: Vec<NodeId> = (0..3)
            .map(|i| graph.add_node(NodeKind::Label, [200.0, i as f32 * 100.0]))
            .collect();
        for label in &labels {
            graph
                .connect(out_ref(&graph, src), in_ref(&graph, *label))
                .unwrap();
        }

        let targets: Vec<NodeId> = graph
            .connections_from(out_ref(&graph, src))
            .map(|c| c.to_node)
            .collect();
        assert_eq!(targets, labels);
    }

    #[test]
    fn test_remove_node_severs_connections() {
        let mut graph = Graph::new();
        let src = graph.add_node(NodeKind::TextInput, [0.0, 0.0]);
        let mid = graph.add_node(NodeKind::Label, [200.0, 0.0]);
        let end = graph.add_node(NodeKind::Label, [400.0, 0.0]);
        graph.connect(out_ref(&graph, src), in_ref(&graph, mid)).unwrap();
        graph.connect(out_ref(&graph, mid), in_ref(&graph, end)).unwrap();

        let removed = graph.remove_node(mid).unwrap();
        assert!(removed.ports().all(|p| !p.is_connected()));
        assert_eq!(graph.connection_count(), 0);
        assert!(!graph.port(out_ref(&graph, src)).unwrap().is_connected());
        assert!(!graph.port(in_ref(&graph, end)).unwrap().is_connected());
        assert_eq!(graph.connections_for_node(src).count(), 0);
        assert!(graph.remove_node(mid).is_none());
    }

    #[test]
    fn test_roots_are_nodes_without_inputs() {
        let mut graph = Graph::new();
        let text = graph.add_node(NodeKind::TextInput, [0.0, 0.0]);
        graph.add_node(NodeKind::Label, [0.0, 0.0]);
        let video = graph.add_node(NodeKind::VideoInput, [0.0, 0.0]);
        graph.add_node(NodeKind::LoadImage, [0.0, 0.0]);
        let path = graph.add_node(NodeKind::Path, [0.0, 0.0]);

        assert_eq!(graph.roots().collect::<Vec<_>>(), vec![text, video, path]);
    }

    #[test]
    fn test_self_loop_is_representable() {
        let mut graph = Graph::new();
        let label = graph.add_node(NodeKind::Label, [0.0, 0.0]);
        let id = graph
            .connect(out_ref(&graph, label), in_ref(&graph, label))
            .unwrap();
        assert_eq!(graph.connection(id).unwrap().from_node, label);
        assert_eq!(graph.connection(id).unwrap().to_node, label);
    }
}
