// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use crate::connection::ConnectionId;
use crate::node::NodeId;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Unique identifier for a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortId(pub u32);

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

/// Data type that can flow through ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Text value
    String,
    /// Decoded RGBA image
    Image,
}

impl DataType {
    /// Name used in the pipeline text format
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Image => "Image",
        }
    }

    /// Parse a data type from its text format name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "String" => Some(Self::String),
            "Image" => Some(Self::Image),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, immutable image handed between nodes
pub type ImageFrame = Arc<RgbaImage>;

/// Value that flows along a connection
#[derive(Debug, Clone, PartialEq)]
pub enum PortValue {
    /// Text
    String(String),
    /// Image
    Image(ImageFrame),
}

impl PortValue {
    /// Get the data type for this value
    pub fn data_type(&self) -> DataType {
        match self {
            Self::String(_) => DataType::String,
            Self::Image(_) => DataType::Image,
        }
    }

    /// Borrow the text, if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(text),
            Self::Image(_) => None,
        }
    }

    /// Borrow the image, if this is an image value
    pub fn as_image(&self) -> Option<&ImageFrame> {
        match self {
            Self::Image(frame) => Some(frame),
            Self::String(_) => None,
        }
    }
}

/// A port on a node
///
/// Ports only record the IDs of the connections touching them; the
/// connections themselves live in the owning [`Graph`](crate::Graph).
#[derive(Debug, Clone)]
pub struct Port {
    id: PortId,
    name: String,
    direction: PortDirection,
    data_type: DataType,
    node: NodeId,
    /// Upstream link (inputs only)
    connected_from: Option<ConnectionId>,
    /// Downstream links in the order they were made (outputs only)
    connected_to: Vec<ConnectionId>,
}

impl Port {
    pub(crate) fn new(
        id: PortId,
        name: impl Into<String>,
        data_type: DataType,
        direction: PortDirection,
        node: NodeId,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            direction,
            data_type,
            node,
            connected_from: None,
            connected_to: Vec::new(),
        }
    }

    /// Port ID
    pub fn id(&self) -> PortId {
        self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direction, fixed at construction
    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    /// Declared data type
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Owning node
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Whether this is an input port
    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }

    /// Whether this is an output port
    pub fn is_output(&self) -> bool {
        self.direction == PortDirection::Output
    }

    /// The single upstream connection of an input port
    pub fn connected_from(&self) -> Option<ConnectionId> {
        self.connected_from
    }

    /// Fan-out of an output port
    pub fn connected_to(&self) -> &[ConnectionId] {
        &self.connected_to
    }

    /// Every connection touching this port
    pub fn connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.connected_from.into_iter().chain(self.connected_to.iter().copied())
    }

    /// Whether any connection touches this port
    pub fn is_connected(&self) -> bool {
        self.connected_from.is_some() || !self.connected_to.is_empty()
    }

    /// Check if a connection to another port is valid.
    ///
    /// Types must match exactly and exactly one side must be an output.
    /// The order of the two ports does not matter.
    pub fn can_connect(&self, other: &Port) -> bool {
        self.data_type == other.data_type && self.direction != other.direction
    }

    pub(crate) fn set_id(&mut self, id: PortId) {
        self.id = id;
    }

    pub(crate) fn set_node(&mut self, node: NodeId) {
        self.node = node;
    }

    pub(crate) fn attach(&mut self, connection: ConnectionId) {
        match self.direction {
            PortDirection::Input => self.connected_from = Some(connection),
            PortDirection::Output => {
                if !self.connected_to.contains(&connection) {
                    self.connected_to.push(connection);
                }
            }
        }
    }

    pub(crate) fn detach(&mut self, connection: ConnectionId) {
        match self.direction {
            PortDirection::Input => {
                if self.connected_from == Some(connection) {
                    self.connected_from = None;
                }
            }
            PortDirection::Output => self.connected_to.retain(|c| *c != connection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(id: u32, data_type: DataType, direction: PortDirection) -> Port {
        Port::new(PortId(id), "Port", data_type, direction, NodeId(1))
    }

    #[test]
    fn test_compatibility_requires_opposite_directions() {
        let out_a = port(1, DataType::String, PortDirection::Output);
        let out_b = port(2, DataType::String, PortDirection::Output);
        let in_a = port(3, DataType::String, PortDirection::Input);
        let in_b = port(4, DataType::String, PortDirection::Input);

        assert!(!out_a.can_connect(&out_b));
        assert!(!in_a.can_connect(&in_b));
        assert!(out_a.can_connect(&in_a));
        assert!(in_a.can_connect(&out_a));
    }

    #[test]
    fn test_compatibility_requires_same_type() {
        let text_out = port(1, DataType::String, PortDirection::Output);
        let image_in = port(2, DataType::Image, PortDirection::Input);
        assert!(!text_out.can_connect(&image_in));
        assert!(!image_in.can_connect(&text_out));
    }

    #[test]
    fn test_output_fan_out_rejects_duplicates() {
        let mut output = port(1, DataType::String, PortDirection::Output);
        output.attach(ConnectionId(7));
        output.attach(ConnectionId(8));
        output.attach(ConnectionId(7));
        assert_eq!(output.connected_to(), &[ConnectionId(7), ConnectionId(8)]);

        output.detach(ConnectionId(7));
        assert_eq!(output.connected_to(), &[ConnectionId(8)]);
    }

    #[test]
    fn test_input_holds_single_upstream() {
        let mut input = port(1, DataType::String, PortDirection::Input);
        input.attach(ConnectionId(1));
        input.attach(ConnectionId(2));
        assert_eq!(input.connected_from(), Some(ConnectionId(2)));

        // Detaching a stale connection leaves the current one alone
        input.detach(ConnectionId(1));
        assert_eq!(input.connected_from(), Some(ConnectionId(2)));
        input.detach(ConnectionId(2));
        assert!(!input.is_connected());
    }

    #[test]
    fn test_data_type_names() {
        assert_eq!(DataType::from_name("String"), Some(DataType::String));
        assert_eq!(DataType::from_name("Image"), Some(DataType::Image));
        assert_eq!(DataType::from_name("Float"), None);
        assert_eq!(DataType::Image.to_string(), "Image");
    }
}
