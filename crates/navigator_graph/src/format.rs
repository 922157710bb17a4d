// SPDX-License-Identifier: MIT OR Apache-2.0
//! Line-oriented pipeline text format.
//!
//! ```text
//! Nodes:<count>
//! Node:<kind tag>
//! Node.ID:<id>
//! Node.Title:<title>
//! Node.Position:<x>,<y>
//! Node.Size:<w>,<h>
//! Node.Data:<payload>            (optional)
//! Node.Inputs:<count>
//! Input:<name>,<data type>,<id>
//! Node.Outputs:<count>
//! Output:<name>,<data type>,<id>
//! Connections:<count>
//! Connection:<from port>,<to port>,<from node>,<to node>
//! ```
//!
//! Each line is split at its first `:`; everything after it is the value.
//! Loading is all-or-nothing: the file is read into a scratch graph that
//! only replaces the current one when every node parsed.

use crate::connection::PortRef;
use crate::graph::Graph;
use crate::kinds::{NodeKind, PayloadError};
use crate::node::{IdAllocator, Node, NodeId};
use crate::port::{DataType, Port, PortDirection, PortId};
use std::collections::HashSet;
use std::fmt::{self, Write as _};
use std::path::Path;

/// Conventional file extension for saved pipelines
pub const PIPELINE_EXTENSION: &str = "pipeline";

/// Error loading a pipeline
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file could not be read
    #[error("Failed to read pipeline: {0}")]
    Io(#[from] std::io::Error),

    /// A line does not follow the grammar
    #[error("line {line}: {reason}")]
    Malformed {
        /// 1-based line number
        line: usize,
        /// What was wrong
        reason: String,
    },

    /// The kind tag names no known node kind
    #[error("line {line}: unknown node kind `{tag}`")]
    UnknownKind {
        /// 1-based line number
        line: usize,
        /// Tag as written
        tag: String,
    },

    /// The persisted port list does not match what the kind declares
    #[error("line {line}: node {node} lists {found} {direction} ports but {kind} declares {expected}")]
    PortCountMismatch {
        /// 1-based line number
        line: usize,
        /// Node being read
        node: NodeId,
        /// Its kind
        kind: NodeKind,
        /// Which port list
        direction: PortDirection,
        /// Count declared by the kind
        expected: usize,
        /// Count found in the file
        found: usize,
    },

    /// A node kind rejected its payload
    #[error("line {line}: node {node}: {source}")]
    InvalidPayload {
        /// 1-based line number
        line: usize,
        /// Node being read
        node: NodeId,
        /// Kind-specific failure
        #[source]
        source: PayloadError,
    },

    /// The same node or port ID appears twice
    #[error("line {line}: duplicate {what} id {id}")]
    DuplicateId {
        /// 1-based line number
        line: usize,
        /// "node" or "port"
        what: &'static str,
        /// The repeated ID
        id: u32,
    },

    /// A node or port ID leaves no room for the IDs minted after it
    #[error("line {line}: {what} id {id} is out of range")]
    IdOutOfRange {
        /// 1-based line number
        line: usize,
        /// "node" or "port"
        what: &'static str,
        /// The offending ID
        id: u32,
    },
}

/// Summary of a successful load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Nodes rebuilt
    pub nodes: usize,
    /// Connections in the loaded graph
    pub connections: usize,
    /// Connection lines overridden by a later line feeding the same input
    pub replaced_connections: usize,
    /// Connections skipped because an endpoint could not be found
    pub skipped_connections: usize,
}

impl Graph {
    /// Serialize the whole graph
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        push_line(&mut out, "Nodes", self.node_count());
        for node in self.nodes() {
            push_line(&mut out, "Node", node.kind().tag());
            push_line(&mut out, "Node.ID", node.id());
            push_line(&mut out, "Node.Title", node.title());
            push_line(
                &mut out,
                "Node.Position",
                format_args!("{},{}", node.position[0], node.position[1]),
            );
            push_line(
                &mut out,
                "Node.Size",
                format_args!("{},{}", node.size[0], node.size[1]),
            );
            if let Some(data) = node.data() {
                push_line(&mut out, "Node.Data", data);
            }
            push_line(&mut out, "Node.Inputs", node.inputs().len());
            for port in node.inputs() {
                push_line(&mut out, "Input", PortLine(port));
            }
            push_line(&mut out, "Node.Outputs", node.outputs().len());
            for port in node.outputs() {
                push_line(&mut out, "Output", PortLine(port));
            }
        }

        push_line(&mut out, "Connections", self.connection_count());
        for connection in self.connections() {
            let (from_port, to_port, from_node, to_node) = connection.tuple();
            push_line(
                &mut out,
                "Connection",
                format_args!("{from_port},{to_port},{from_node},{to_node}"),
            );
        }

        out
    }

    /// Write the graph to a file, replacing it
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_text())?;
        tracing::info!(
            "Saved {} nodes and {} connections to {}",
            self.node_count(),
            self.connection_count(),
            path.display()
        );
        Ok(())
    }

    /// Parse a pipeline into a new graph
    pub fn from_text(text: &str) -> Result<(Graph, LoadReport), LoadError> {
        let mut graph = Graph::new();
        let report = graph.load_text(text)?;
        Ok((graph, report))
    }

    /// Replace this graph with the parsed pipeline.
    ///
    /// On error the graph is left untouched. ID counters keep whichever is
    /// larger: their current value or one past the highest loaded ID.
    pub fn load_text(&mut self, text: &str) -> Result<LoadReport, LoadError> {
        let mut scratch = Graph::with_limits(self.limits().clone());
        scratch.ids = self.ids.clone();

        let report = read_pipeline(&mut scratch, text)?;

        scratch.ids.merge(&self.ids);
        *self = scratch;
        Ok(report)
    }

    /// Replace this graph with the pipeline stored at `path`
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<LoadReport, LoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let report = self.load_text(&text)?;
        tracing::info!(
            "Loaded {} nodes and {} connections from {} ({} skipped)",
            report.nodes,
            report.connections,
            path.display(),
            report.skipped_connections
        );
        Ok(report)
    }
}

fn push_line(out: &mut String, key: &str, value: impl fmt::Display) {
    let _ = writeln!(out, "{key}:{value}");
}

/// `<name>,<data type>,<id>`
struct PortLine<'a>(&'a Port);

impl fmt::Display for PortLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.0.name(), self.0.data_type(), self.0.id())
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry<'a> {
    line: usize,
    key: &'a str,
    value: &'a str,
}

/// Cursor over the non-blank lines of a pipeline file
struct Reader<'a> {
    entries: Vec<Entry<'a>>,
    pos: usize,
    line_count: usize,
}

impl<'a> Reader<'a> {
    fn new(text: &'a str) -> Result<Self, LoadError> {
        let mut entries = Vec::new();
        let mut line_count = 0;
        for (index, raw) in text.lines().enumerate() {
            line_count = index + 1;
            if raw.trim().is_empty() {
                continue;
            }
            let Some((key, value)) = raw.split_once(':') else {
                return Err(malformed(line_count, format!("missing `:` in `{raw}`")));
            };
            entries.push(Entry {
                line: line_count,
                key: key.trim(),
                value,
            });
        }
        Ok(Self {
            entries,
            pos: 0,
            line_count,
        })
    }

    fn expect(&mut self, key: &str) -> Result<Entry<'a>, LoadError> {
        match self.entries.get(self.pos) {
            Some(entry) if entry.key == key => {
                self.pos += 1;
                Ok(*entry)
            }
            Some(entry) => Err(malformed(
                entry.line,
                format!("expected `{key}`, found `{}`", entry.key),
            )),
            None => Err(malformed(
                self.line_count + 1,
                format!("unexpected end of file, expected `{key}`"),
            )),
        }
    }

    fn take_if(&mut self, key: &str) -> Option<Entry<'a>> {
        let entry = self.entries.get(self.pos).filter(|e| e.key == key).copied()?;
        self.pos += 1;
        Some(entry)
    }

    fn finish(&self) -> Result<(), LoadError> {
        match self.entries.get(self.pos) {
            Some(entry) => Err(malformed(
                entry.line,
                format!("unexpected `{}` after the last connection", entry.key),
            )),
            None => Ok(()),
        }
    }
}

fn malformed(line: usize, reason: impl Into<String>) -> LoadError {
    LoadError::Malformed {
        line,
        reason: reason.into(),
    }
}

fn parse_count(entry: Entry<'_>) -> Result<usize, LoadError> {
    entry
        .value
        .trim()
        .parse()
        .map_err(|_| malformed(entry.line, format!("invalid count `{}`", entry.value)))
}

fn parse_id(line: usize, text: &str) -> Result<u32, LoadError> {
    text.trim()
        .parse()
        .map_err(|_| malformed(line, format!("invalid id `{text}`")))
}

fn parse_pair(entry: Entry<'_>) -> Result<[f32; 2], LoadError> {
    let invalid = || malformed(entry.line, format!("invalid pair `{}`", entry.value));
    let (x, y) = entry.value.split_once(',').ok_or_else(invalid)?;
    let x = x.trim().parse().map_err(|_| invalid())?;
    let y = y.trim().parse().map_err(|_| invalid())?;
    Ok([x, y])
}

/// `<name>,<data type>,<id>`; the name may itself contain commas
fn parse_port_line(entry: Entry<'_>) -> Result<(DataType, PortId), LoadError> {
    let mut parts = entry.value.rsplitn(3, ',');
    let (Some(id), Some(data_type), Some(_name)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(malformed(
            entry.line,
            format!("invalid port `{}`", entry.value),
        ));
    };
    let data_type = DataType::from_name(data_type.trim()).ok_or_else(|| {
        malformed(entry.line, format!("unknown data type `{data_type}`"))
    })?;
    Ok((data_type, PortId(parse_id(entry.line, id)?)))
}

fn read_pipeline(graph: &mut Graph, text: &str) -> Result<LoadReport, LoadError> {
    let mut reader = Reader::new(text)?;
    let mut report = LoadReport::default();
    let mut seen_ports = HashSet::new();

    let node_count = parse_count(reader.expect("Nodes")?)?;
    for _ in 0..node_count {
        read_node(&mut reader, graph, &mut seen_ports)?;
        report.nodes += 1;
    }

    let highest_node = graph.node_ids().max();
    let highest_port = seen_ports.iter().copied().max();
    graph.ids.advance_past(highest_node, highest_port);

    let connection_count = parse_count(reader.expect("Connections")?)?;
    for _ in 0..connection_count {
        let entry = reader.expect("Connection")?;
        let fields: Vec<&str> = entry.value.split(',').collect();
        let [from_port, to_port, from_node, to_node] = fields.as_slice() else {
            return Err(malformed(
                entry.line,
                format!("invalid connection `{}`", entry.value),
            ));
        };
        let output = PortRef::new(
            NodeId(parse_id(entry.line, from_node)?),
            PortId(parse_id(entry.line, from_port)?),
        );
        let input = PortRef::new(
            NodeId(parse_id(entry.line, to_node)?),
            PortId(parse_id(entry.line, to_port)?),
        );

        if endpoints_match(graph, output, input) {
            if graph.port(input).and_then(Port::connected_from).is_some() {
                tracing::warn!(
                    "line {}: connection into port {} (node {}) replaces an earlier one",
                    entry.line,
                    input.port,
                    input.node
                );
                report.replaced_connections += 1;
            }
            graph.commit(output, input);
        } else {
            tracing::warn!(
                "line {}: skipping connection {} (node {}) -> {} (node {}): endpoint not found",
                entry.line,
                output.port,
                output.node,
                input.port,
                input.node
            );
            report.skipped_connections += 1;
        }
    }

    report.connections = graph.connection_count();
    reader.finish()?;
    Ok(report)
}

fn read_node(
    reader: &mut Reader<'_>,
    graph: &mut Graph,
    seen_ports: &mut HashSet<PortId>,
) -> Result<(), LoadError> {
    let header = reader.expect("Node")?;
    let kind = NodeKind::from_tag(header.value.trim()).ok_or_else(|| LoadError::UnknownKind {
        line: header.line,
        tag: header.value.to_string(),
    })?;
    // Every ID is overwritten below, so the graph's counters stay untouched
    let mut node = Node::new(kind, [0.0, 0.0], &mut IdAllocator::new());

    let id_entry = reader.expect("Node.ID")?;
    let id = NodeId(parse_id(id_entry.line, id_entry.value)?);
    check_range(id_entry.line, "node", id.0)?;
    if graph.node(id).is_some() {
        return Err(LoadError::DuplicateId {
            line: id_entry.line,
            what: "node",
            id: id.0,
        });
    }
    node.set_id(id);

    node.set_title(reader.expect("Node.Title")?.value);
    node.position = parse_pair(reader.expect("Node.Position")?)?;
    node.size = parse_pair(reader.expect("Node.Size")?)?;

    if let Some(data) = reader.take_if("Node.Data") {
        node.set_data(data.value)
            .map_err(|source| LoadError::InvalidPayload {
                line: data.line,
                node: id,
                source,
            })?;
    }

    read_ports(reader, &mut node, PortDirection::Input, seen_ports)?;
    read_ports(reader, &mut node, PortDirection::Output, seen_ports)?;

    graph.insert_node(node);
    Ok(())
}

/// Patch persisted IDs onto the freshly declared ports, in order
fn read_ports(
    reader: &mut Reader<'_>,
    node: &mut Node,
    direction: PortDirection,
    seen_ports: &mut HashSet<PortId>,
) -> Result<(), LoadError> {
    let (count_key, port_key) = match direction {
        PortDirection::Input => ("Node.Inputs", "Input"),
        PortDirection::Output => ("Node.Outputs", "Output"),
    };

    let header = reader.expect(count_key)?;
    let found = parse_count(header)?;
    let kind = node.kind();
    let node_id = node.id();
    let ports = match direction {
        PortDirection::Input => node.inputs_mut(),
        PortDirection::Output => node.outputs_mut(),
    };
    if found != ports.len() {
        return Err(LoadError::PortCountMismatch {
            line: header.line,
            node: node_id,
            kind,
            direction,
            expected: ports.len(),
            found,
        });
    }

    for port in ports.iter_mut() {
        let entry = reader.expect(port_key)?;
        let (data_type, id) = parse_port_line(entry)?;
        if data_type != port.data_type() {
            return Err(malformed(
                entry.line,
                format!(
                    "port {} of {} carries {}, not {}",
                    port.name(),
                    kind,
                    port.data_type(),
                    data_type
                ),
            ));
        }
        check_range(entry.line, "port", id.0)?;
        if !seen_ports.insert(id) {
            return Err(LoadError::DuplicateId {
                line: entry.line,
                what: "port",
                id: id.0,
            });
        }
        port.set_id(id);
    }
    Ok(())
}

/// The allocator mints one past the highest loaded ID, so the maximum is unusable
fn check_range(line: usize, what: &'static str, id: u32) -> Result<(), LoadError> {
    if id == u32::MAX {
        return Err(LoadError::IdOutOfRange { line, what, id });
    }
    Ok(())
}

/// Both ends exist, point the right way and agree on type
fn endpoints_match(graph: &Graph, output: PortRef, input: PortRef) -> bool {
    match (graph.port(output), graph.port(input)) {
        (Some(from), Some(to)) => from.is_output() && to.is_input() && from.can_connect(to),
        _ => false,
    }
}
