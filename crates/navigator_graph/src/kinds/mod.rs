// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node kinds.
//!
//! Every kind implements [`NodeBehavior`]: it declares its ports once at
//! construction, answers output reads, accepts input writes, and optionally
//! persists a scalar payload. [`NodeContent`] is the closed set of kinds the
//! graph can hold and the one the text format knows how to rebuild.

pub mod image_loader;
pub mod text;
pub mod video;

use crate::node::PortBuilder;
use crate::port::PortValue;
use std::fmt;

pub use self::image_loader::ImageLoader;
pub use self::text::{Concat, Label, PathSource, TextInput};
pub use self::video::{FrameSlot, VideoInput};

/// Namespace older pipeline files put in front of kind tags
const LEGACY_TAG_PREFIX: &str = "ProcessPipeline.Nodes.";

/// Discriminator for the built-in node kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Constant text source
    TextInput,
    /// Text pass-through that remembers what it last received
    Label,
    /// File path source
    Path,
    /// Joins two texts
    Concat,
    /// Decodes the image found at its input path
    LoadImage,
    /// Publishes the latest frame of a video producer
    VideoInput,
}

impl NodeKind {
    /// All built-in kinds
    pub const ALL: [NodeKind; 6] = [
        NodeKind::TextInput,
        NodeKind::Label,
        NodeKind::Path,
        NodeKind::Concat,
        NodeKind::LoadImage,
        NodeKind::VideoInput,
    ];

    /// Tag written to the pipeline text format
    pub fn tag(&self) -> &'static str {
        match self {
            Self::TextInput => "TextInputNode",
            Self::Label => "LabelNode",
            Self::Path => "PathNode",
            Self::Concat => "ConcatNode",
            Self::LoadImage => "LoadImageNode",
            Self::VideoInput => "VideoInputNode",
        }
    }

    /// Resolve a tag, accepting the legacy namespaced spelling too
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.strip_prefix(LEGACY_TAG_PREFIX).unwrap_or(tag);
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Title given to freshly created nodes
    pub fn default_title(&self) -> &'static str {
        match self {
            Self::TextInput => "Text Input Node",
            Self::Label => "Label Node",
            Self::Path => "Path Node",
            Self::Concat => "Concat Node",
            Self::LoadImage => "Load Image Node",
            Self::VideoInput => "Video Input Node",
        }
    }

    /// Size given to freshly created nodes
    pub fn default_size(&self) -> [f32; 2] {
        match self {
            Self::TextInput | Self::Label | Self::Concat => [200.0, 100.0],
            Self::Path => [300.0, 100.0],
            Self::LoadImage => [200.0, 200.0],
            Self::VideoInput => [300.0, 200.0],
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error restoring a node's persisted payload
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// The kind does not persist any payload
    #[error("{0} does not carry a payload")]
    Unsupported(NodeKind),

    /// The payload is not a valid JSON string
    #[error("invalid {kind} payload: {source}")]
    Json {
        /// Kind that rejected the payload
        kind: NodeKind,
        /// Parse failure
        #[source]
        source: serde_json::Error,
    },
}

/// Port contract every node kind fulfils
pub trait NodeBehavior {
    /// Kind discriminator
    fn kind(&self) -> NodeKind;

    /// Declare ports. Must produce the same names, types and order every time.
    fn declare_ports(&self, ports: &mut PortBuilder<'_>);

    /// Setter for the input port at `index`; `None` clears
    fn set_input(&mut self, index: usize, value: Option<PortValue>);

    /// Getter for the output port at `index`; must not block
    fn output(&self, index: usize) -> Option<PortValue>;

    /// Work done when the node is visited, before values are pushed downstream
    fn process(&mut self) {}

    /// Payload to persist, if this kind has one
    fn data(&self) -> Option<String> {
        None
    }

    /// Restore a persisted payload
    fn set_data(&mut self, _data: &str) -> Result<(), PayloadError> {
        Err(PayloadError::Unsupported(self.kind()))
    }
}

/// Kind-specific state of a node
#[derive(Debug, Clone)]
pub enum NodeContent {
    /// See [`TextInput`]
    TextInput(TextInput),
    /// See [`Label`]
    Label(Label),
    /// See [`PathSource`]
    Path(PathSource),
    /// See [`Concat`]
    Concat(Concat),
    /// See [`ImageLoader`]
    LoadImage(ImageLoader),
    /// See [`VideoInput`]
    VideoInput(VideoInput),
}

impl NodeContent {
    /// Default content for a kind
    pub fn new(kind: NodeKind) -> Self {
        match kind {
            NodeKind::TextInput => Self::TextInput(TextInput::default()),
            NodeKind::Label => Self::Label(Label::default()),
            NodeKind::Path => Self::Path(PathSource::default()),
            NodeKind::Concat => Self::Concat(Concat::default()),
            NodeKind::LoadImage => Self::LoadImage(ImageLoader::default()),
            NodeKind::VideoInput => Self::VideoInput(VideoInput::default()),
        }
    }

    fn behavior(&self) -> &dyn NodeBehavior {
        match self {
            Self::TextInput(node) => node,
            Self::Label(node) => node,
            Self::Path(node) => node,
            Self::Concat(node) => node,
            Self::LoadImage(node) => node,
            Self::VideoInput(node) => node,
        }
    }

    fn behavior_mut(&mut self) -> &mut dyn NodeBehavior {
        match self {
            Self::TextInput(node) => node,
            Self::Label(node) => node,
            Self::Path(node) => node,
            Self::Concat(node) => node,
            Self::LoadImage(node) => node,
            Self::VideoInput(node) => node,
        }
    }

    /// Kind discriminator
    pub fn kind(&self) -> NodeKind {
        self.behavior().kind()
    }

    /// Text input state, if this is a text input node
    pub fn as_text_input_mut(&mut self) -> Option<&mut TextInput> {
        match self {
            Self::TextInput(node) => Some(node),
            _ => None,
        }
    }

    /// Label state, if this is a label node
    pub fn as_label(&self) -> Option<&Label> {
        match self {
            Self::Label(node) => Some(node),
            _ => None,
        }
    }

    /// Path state, if this is a path node
    pub fn as_path_mut(&mut self) -> Option<&mut PathSource> {
        match self {
            Self::Path(node) => Some(node),
            _ => None,
        }
    }

    /// Concat state, if this is a concat node
    pub fn as_concat_mut(&mut self) -> Option<&mut Concat> {
        match self {
            Self::Concat(node) => Some(node),
            _ => None,
        }
    }

    /// Image loader state, if this is an image loader
    pub fn as_image_loader(&self) -> Option<&ImageLoader> {
        match self {
            Self::LoadImage(node) => Some(node),
            _ => None,
        }
    }

    /// Video state, if this is a video input node
    pub fn as_video_input(&self) -> Option<&VideoInput> {
        match self {
            Self::VideoInput(node) => Some(node),
            _ => None,
        }
    }
}

impl NodeBehavior for NodeContent {
    fn kind(&self) -> NodeKind {
        self.behavior().kind()
    }

    fn declare_ports(&self, ports: &mut PortBuilder<'_>) {
        self.behavior().declare_ports(ports);
    }

    fn set_input(&mut self, index: usize, value: Option<PortValue>) {
        self.behavior_mut().set_input(index, value);
    }

    fn output(&self, index: usize) -> Option<PortValue> {
        self.behavior().output(index)
    }

    fn process(&mut self) {
        self.behavior_mut().process();
    }

    fn data(&self) -> Option<String> {
        self.behavior().data()
    }

    fn set_data(&mut self, data: &str) -> Result<(), PayloadError> {
        self.behavior_mut().set_data(data)
    }
}

/// Encode a string payload as a single-line JSON string
pub(crate) fn encode_string(value: &str) -> Option<String> {
    serde_json::to_string(value).ok()
}

/// Decode a JSON string payload
pub(crate) fn decode_string(kind: NodeKind, data: &str) -> Result<String, PayloadError> {
    serde_json::from_str(data).map_err(|source| PayloadError::Json { kind, source })
}
