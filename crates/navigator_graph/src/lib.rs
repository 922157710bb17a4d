// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed dataflow graph engine for Navigator pipelines.
//!
//! A pipeline is a directed graph of nodes. Each node declares typed input
//! and output ports once, when it is built; connections join an output to
//! an input of the same [`DataType`].
//!
//! ## Architecture
//!
//! - [`Graph`] owns nodes, the connection arena and the ID counters
//! - [`Graph::on_port_clicked`] drives the two-click connection protocol
//! - [`Graph::execute`] pushes values from root nodes downstream
//! - [`Graph::save`] / [`Graph::load`] use a line-oriented text format that
//!   keeps node and port IDs stable
//!
//! The graph is single-threaded. Hosts that touch it from several threads
//! share it as a [`SharedGraph`]; video producers publish into a
//! [`FrameSlot`] instead and never lock the graph.

pub mod connection;
pub mod evaluation;
pub mod format;
pub mod graph;
pub mod interaction;
pub mod kinds;
pub mod node;
pub mod port;
pub mod settings;

pub use connection::{Connection, ConnectionId, PortRef};
pub use evaluation::{ExecutionLimits, ExecutionReport};
pub use format::{LoadError, LoadReport, PIPELINE_EXTENSION};
pub use graph::{ConnectionError, Graph};
pub use interaction::{ClickOutcome, LinkState};
pub use kinds::{
    Concat, FrameSlot, ImageLoader, Label, NodeBehavior, NodeContent, NodeKind, PathSource,
    PayloadError, TextInput, VideoInput,
};
pub use node::{IdAllocator, Node, NodeId, PortBuilder};
pub use port::{DataType, ImageFrame, Port, PortDirection, PortId, PortValue};
pub use settings::{PipelineSettings, SettingsError};

/// A graph shared between host threads. Every call goes through the lock.
pub type SharedGraph = std::sync::Arc<parking_lot::Mutex<Graph>>;
