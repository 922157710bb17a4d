// SPDX-License-Identifier: MIT OR Apache-2.0
//! Click-to-connect protocol.
//!
//! The host reports port clicks; the first click arms a port, the second
//! either commits a connection or discards the armed port. A cancel signal
//! (a right click in an editor host) drops the armed port without
//! committing anything.

use crate::connection::{ConnectionId, PortRef};
use crate::graph::Graph;
use crate::node::NodeId;
use crate::port::PortId;

/// Connection-formation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// Nothing armed
    #[default]
    Idle,
    /// Waiting for the second click
    ArmedFrom(PortRef),
}

/// What a port click did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// First click; the port is now armed
    Armed(PortRef),
    /// Second click on a compatible port; connection committed
    Connected(ConnectionId),
    /// Second click on an incompatible port; nothing committed
    Rejected,
    /// The clicked port does not exist; state unchanged
    Ignored,
}

impl Graph {
    /// Feed a port click into the connection protocol
    pub fn on_port_clicked(&mut self, node: NodeId, port: PortId) -> ClickOutcome {
        let clicked = PortRef::new(node, port);

        match self.link_state {
            LinkState::Idle => {
                if self.port(clicked).is_none() {
                    tracing::debug!("Ignoring click on unknown port {} of node {}", port, node);
                    return ClickOutcome::Ignored;
                }
                tracing::debug!("Armed port {} of node {}", port, node);
                self.link_state = LinkState::ArmedFrom(clicked);
                ClickOutcome::Armed(clicked)
            }
            LinkState::ArmedFrom(armed) => {
                self.link_state = LinkState::Idle;
                match self.connect(armed, clicked) {
                    Ok(id) => ClickOutcome::Connected(id),
                    Err(e) => {
                        tracing::debug!("Connection attempt dropped: {}", e);
                        ClickOutcome::Rejected
                    }
                }
            }
        }
    }

    /// Drop the armed port, if any. Returns whether something was armed.
    pub fn cancel_pending_connection(&mut self) -> bool {
        let was_armed = self.link_state != LinkState::Idle;
        self.link_state = LinkState::Idle;
        was_armed
    }

    /// The currently armed port
    pub fn pending_connection(&self) -> Option<PortRef> {
        match self.link_state {
            LinkState::Idle => None,
            LinkState::ArmedFrom(armed) => Some(armed),
        }
    }

    /// Current protocol state
    pub fn link_state(&self) -> LinkState {
        self.link_state
    }
}
