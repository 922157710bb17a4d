// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.

use crate::node::NodeId;
use crate::port::PortId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a connection
///
/// Connection IDs are internal to a graph instance and are not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u32);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A port addressed through its owning node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    /// Owning node
    pub node: NodeId,
    /// Port on that node
    pub port: PortId,
}

impl PortRef {
    /// Create a new port reference
    pub fn new(node: NodeId, port: PortId) -> Self {
        Self { node, port }
    }
}

/// A connection from one output port to one input port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Source node ID
    pub from_node: NodeId,
    /// Source (output) port ID
    pub from_port: PortId,
    /// Target node ID
    pub to_node: NodeId,
    /// Target (input) port ID
    pub to_port: PortId,
}

impl Connection {
    /// Create a new connection
    pub fn new(id: ConnectionId, from: PortRef, to: PortRef) -> Self {
        Self {
            id,
            from_node: from.node,
            from_port: from.port,
            to_node: to.node,
            to_port: to.port,
        }
    }

    /// Source end
    pub fn from(&self) -> PortRef {
        PortRef::new(self.from_node, self.from_port)
    }

    /// Target end
    pub fn to(&self) -> PortRef {
        PortRef::new(self.to_node, self.to_port)
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from_node == node_id || self.to_node == node_id
    }

    /// The persisted 4-tuple `(from port, to port, from node, to node)`
    pub fn tuple(&self) -> (PortId, PortId, NodeId, NodeId) {
        (self.from_port, self.to_port, self.from_node, self.to_node)
    }
}
