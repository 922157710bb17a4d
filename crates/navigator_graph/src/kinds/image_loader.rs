// SPDX-License-Identifier: MIT OR Apache-2.0
//! Image loader node: decodes the file named on its input.

use super::{NodeBehavior, NodeKind};
use crate::node::PortBuilder;
use crate::port::{DataType, ImageFrame, PortValue};
use std::sync::Arc;

/// Decodes the image at its input path each time it is processed
#[derive(Debug, Clone, Default)]
pub struct ImageLoader {
    path: Option<String>,
    image: Option<ImageFrame>,
}

impl ImageLoader {
    /// Path last received on the input
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Most recently decoded image
    pub fn image(&self) -> Option<&ImageFrame> {
        self.image.as_ref()
    }
}

impl NodeBehavior for ImageLoader {
    fn kind(&self) -> NodeKind {
        NodeKind::LoadImage
    }

    fn declare_ports(&self, ports: &mut PortBuilder<'_>) {
        ports
            .add_input("Input", DataType::String)
            .add_output("Output", DataType::Image);
    }

    fn set_input(&mut self, index: usize, value: Option<PortValue>) {
        if index == 0 {
            self.path = value.and_then(|v| v.as_str().map(str::to_owned));
        }
    }

    fn output(&self, index: usize) -> Option<PortValue> {
        if index != 0 {
            return None;
        }
        self.image.clone().map(PortValue::Image)
    }

    fn process(&mut self) {
        self.image = match self.path.as_deref() {
            Some(path) if !path.is_empty() => match image::open(path) {
                Ok(decoded) => {
                    let rgba = decoded.to_rgba8();
                    tracing::debug!(
                        "Decoded {} ({}x{})",
                        path,
                        rgba.width(),
                        rgba.height()
                    );
                    Some(Arc::new(rgba))
                }
                Err(e) => {
                    tracing::warn!("Failed to load image {}: {}", path, e);
                    None
                }
            },
            _ => None,
        };
    }
}
