// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph evaluation and execution.
//!
//! Execution is push-based: every root node (a node without input ports)
//! hands its output values to the inputs it feeds, and each receiving node
//! is then processed in turn, depth first, before the next connection is
//! followed. Traversal uses an explicit frame stack instead of recursion.
//!
//! A node reached along a path that already contains it closes a cycle.
//! Its setter still receives the value, but the node is not entered again.
//! Nodes fed by several paths are processed once per path.

use crate::connection::ConnectionId;
use crate::graph::Graph;
use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// Default bound on node visits per [`Graph::execute`] call
pub const DEFAULT_MAX_VISITS: usize = 10_000;

/// Bounds applied while executing a graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionLimits {
    /// Maximum number of node visits before the run stops
    pub max_visits: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_visits: DEFAULT_MAX_VISITS,
        }
    }
}

/// Summary of one [`Graph::execute`] call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Root nodes the run started from
    pub roots: usize,
    /// Node visits, counting repeat visits
    pub visits: usize,
    /// Connections not followed because they closed a cycle
    pub cycles_cut: usize,
    /// Whether the run hit `max_visits` and stopped early
    pub truncated: bool,
}

/// A node being processed and its outgoing connections
struct Frame {
    node: NodeId,
    edges: Vec<ConnectionId>,
    next: usize,
}

impl Graph {
    /// Process every root node and propagate values downstream
    pub fn execute(&mut self) -> ExecutionReport {
        let roots: Vec<NodeId> = self.roots().collect();
        let mut report = ExecutionReport {
            roots: roots.len(),
            ..ExecutionReport::default()
        };

        for root in roots {
            if !self.propagate_from(root, &mut report) {
                report.truncated = true;
                tracing::warn!(
                    "Execution stopped after {} node visits",
                    report.visits
                );
                break;
            }
        }

        tracing::debug!(
            "Executed {} roots, {} visits, {} cycles cut",
            report.roots,
            report.visits,
            report.cycles_cut
        );
        report
    }

    /// Depth-first push from one root. Returns `false` when the visit budget ran out.
    fn propagate_from(&mut self, root: NodeId, report: &mut ExecutionReport) -> bool {
        let mut stack = Vec::new();
        match self.enter(root, report) {
            Some(frame) => stack.push(frame),
            None => return false,
        }

        while let Some(frame) = stack.last_mut() {
            let Some(&edge) = frame.edges.get(frame.next) else {
                stack.pop();
                continue;
            };
            frame.next += 1;

            let Some(connection) = self.connection(edge).copied() else {
                continue;
            };

            let value = self
                .node(connection.from_node)
                .and_then(|n| n.read_output(connection.from_port));
            if let Some(target) = self.node_mut(connection.to_node) {
                target.write_input(connection.to_port, value);
            }

            if stack.iter().any(|f| f.node == connection.to_node) {
                tracing::warn!(
                    "Cycle through node {} cut at connection {}",
                    connection.to_node,
                    edge
                );
                report.cycles_cut += 1;
                continue;
            }

            match self.enter(connection.to_node, report) {
                Some(frame) => stack.push(frame),
                None => return false,
            }
        }
        true
    }

    /// Run a node's process hook and snapshot its fan-out
    fn enter(&mut self, node_id: NodeId, report: &mut ExecutionReport) -> Option<Frame> {
        if report.visits >= self.limits().max_visits {
            return None;
        }
        report.visits += 1;

        let node = self.node_mut(node_id)?;
        node.run_process_hook();
        let edges = node
            .outputs()
            .iter()
            .flat_map(|port| port.connected_to().iter().copied())
            .collect();

        Some(Frame {
            node: node_id,
            edges,
            next: 0,
        })
    }
}
