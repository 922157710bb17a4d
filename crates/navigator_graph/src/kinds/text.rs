// SPDX-License-Identifier: MIT OR Apache-2.0
//! Text-carrying nodes: constant text, labels and file paths.

use super::{decode_string, encode_string, NodeBehavior, NodeKind, PayloadError};
use crate::node::PortBuilder;
use crate::port::{DataType, PortValue};

/// Constant text source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextInput {
    /// Text published on the output
    pub text: String,
}

impl TextInput {
    /// Create a source holding `text`
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl NodeBehavior for TextInput {
    fn kind(&self) -> NodeKind {
        NodeKind::TextInput
    }

    fn declare_ports(&self, ports: &mut PortBuilder<'_>) {
        ports.add_output("Output", DataType::String);
    }

    fn set_input(&mut self, _index: usize, _value: Option<PortValue>) {}

    fn output(&self, index: usize) -> Option<PortValue> {
        (index == 0).then(|| PortValue::String(self.text.clone()))
    }

    fn data(&self) -> Option<String> {
        encode_string(&self.text)
    }

    fn set_data(&mut self, data: &str) -> Result<(), PayloadError> {
        self.text = decode_string(self.kind(), data)?;
        Ok(())
    }
}

/// Text pass-through; shows and forwards whatever it last received
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Label {
    /// Current label text, `None` until something arrives
    pub text: Option<String>,
}

impl Label {
    /// Create a label with initial text
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    /// Current text, empty if nothing arrived yet
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

impl NodeBehavior for Label {
    fn kind(&self) -> NodeKind {
        NodeKind::Label
    }

    fn declare_ports(&self, ports: &mut PortBuilder<'_>) {
        ports
            .add_input("Input", DataType::String)
            .add_output("Output", DataType::String);
    }

    fn set_input(&mut self, index: usize, value: Option<PortValue>) {
        if index == 0 {
            self.text = value.and_then(|v| v.as_str().map(str::to_owned));
        }
    }

    fn output(&self, index: usize) -> Option<PortValue> {
        if index != 0 {
            return None;
        }
        self.text.clone().map(PortValue::String)
    }

    fn data(&self) -> Option<String> {
        self.text.as_deref().and_then(encode_string)
    }

    fn set_data(&mut self, data: &str) -> Result<(), PayloadError> {
        self.text = Some(decode_string(self.kind(), data)?);
        Ok(())
    }
}

/// File path source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathSource {
    /// Path published on the output
    pub path: String,
}

impl PathSource {
    /// Create a source holding `path`
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl NodeBehavior for PathSource {
    fn kind(&self) -> NodeKind {
        NodeKind::Path
    }

    fn declare_ports(&self, ports: &mut PortBuilder<'_>) {
        ports.add_output("Output", DataType::String);
    }

    fn set_input(&mut self, _index: usize, _value: Option<PortValue>) {}

    fn output(&self, index: usize) -> Option<PortValue> {
        (index == 0).then(|| PortValue::String(self.path.clone()))
    }

    fn data(&self) -> Option<String> {
        encode_string(&self.path)
    }

    fn set_data(&mut self, data: &str) -> Result<(), PayloadError> {
        self.path = decode_string(self.kind(), data)?;
        Ok(())
    }
}

/// Joins the texts on its two inputs with a separator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Concat {
    /// Placed between the two texts when both are present
    pub separator: String,
    first: Option<String>,
    second: Option<String>,
}

impl Concat {
    /// Create a concat node with the given separator
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            ..Self::default()
        }
    }

    /// Joined text, `None` while neither input has a value
    pub fn joined(&self) -> Option<String> {
        match (&self.first, &self.second) {
            (None, None) => None,
            (Some(text), None) | (None, Some(text)) => Some(text.clone()),
            (Some(first), Some(second)) => Some(format!("{first}{}{second}", self.separator)),
        }
    }
}

impl NodeBehavior for Concat {
    fn kind(&self) -> NodeKind {
        NodeKind::Concat
    }

    fn declare_ports(&self, ports: &mut PortBuilder<'_>) {
        ports
            .add_input("First", DataType::String)
            .add_input("Second", DataType::String)
            .add_output("Output", DataType::String);
    }

    fn set_input(&mut self, index: usize, value: Option<PortValue>) {
        let text = value.and_then(|v| v.as_str().map(str::to_owned));
        match index {
            0 => self.first = text,
            1 => self.second = text,
            _ => {}
        }
    }

    fn output(&self, index: usize) -> Option<PortValue> {
        if index != 0 {
            return None;
        }
        self.joined().map(PortValue::String)
    }

    fn data(&self) -> Option<String> {
        encode_string(&self.separator)
    }

    fn set_data(&mut self, data: &str) -> Result<(), PayloadError> {
        self.separator = decode_string(self.kind(), data)?;
        Ok(())
    }
}
