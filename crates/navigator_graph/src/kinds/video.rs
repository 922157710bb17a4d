// SPDX-License-Identifier: MIT OR Apache-2.0
//! Video input node.
//!
//! Decoding happens elsewhere: a producer thread holds a [`FrameSlot`] and
//! publishes frames into it. The node only ever reads the latest frame, and
//! never waits for the producer to do so.

use super::{decode_string, encode_string, NodeBehavior, NodeKind, PayloadError};
use crate::node::PortBuilder;
use crate::port::{DataType, ImageFrame, PortValue};
use image::RgbaImage;
use parking_lot::Mutex;
use std::sync::Arc;

/// Latest-frame mailbox shared between a producer and a [`VideoInput`]
#[derive(Debug, Clone, Default)]
pub struct FrameSlot(Arc<Mutex<Option<ImageFrame>>>);

impl FrameSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the latest frame
    pub fn publish(&self, frame: RgbaImage) {
        *self.0.lock() = Some(Arc::new(frame));
    }

    /// Drop the latest frame, e.g. when the stream ends
    pub fn clear(&self) {
        *self.0.lock() = None;
    }

    /// Latest frame without blocking; a slot being written reads as empty
    pub fn latest(&self) -> Option<ImageFrame> {
        self.0.try_lock().and_then(|frame| frame.clone())
    }
}

/// Publishes the latest frame of an external video producer
#[derive(Debug, Clone, Default)]
pub struct VideoInput {
    /// Media the producer decodes
    pub source: String,
    slot: FrameSlot,
}

impl VideoInput {
    /// Create a node for the given media path
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            slot: FrameSlot::new(),
        }
    }

    /// Handle for the producer to publish frames through
    pub fn frame_slot(&self) -> FrameSlot {
        self.slot.clone()
    }
}

impl NodeBehavior for VideoInput {
    fn kind(&self) -> NodeKind {
        NodeKind::VideoInput
    }

    fn declare_ports(&self, ports: &mut PortBuilder<'_>) {
        ports.add_output("Output", DataType::Image);
    }

    fn set_input(&mut self, _index: usize, _value: Option<PortValue>) {}

    fn output(&self, index: usize) -> Option<PortValue> {
        if index != 0 {
            return None;
        }
        self.slot.latest().map(PortValue::Image)
    }

    fn data(&self) -> Option<String> {
        encode_string(&self.source)
    }

    fn set_data(&mut self, data: &str) -> Result<(), PayloadError> {
        self.source = decode_string(self.kind(), data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_output_tracks_latest_frame() {
        let node = VideoInput::new("clip.mp4");
        assert_eq!(node.output(0), None);

        let slot = node.frame_slot();
        slot.publish(RgbaImage::new(4, 4));
        slot.publish(RgbaImage::new(8, 2));

        let Some(PortValue::Image(frame)) = node.output(0) else {
            panic!("expected a frame");
        };
        assert_eq!(frame.dimensions(), (8, 2));

        slot.clear();
        assert_eq!(node.output(0), None);
    }

    #[test]
    fn test_read_does_not_wait_for_producer() {
        let node = VideoInput::new("clip.mp4");
        let slot = node.frame_slot();
        slot.publish(RgbaImage::new(1, 1));

        // Hold the lock the way a producer mid-write would
        let guard = slot.0.lock();
        assert_eq!(node.output(0), None);
        drop(guard);
        assert!(node.output(0).is_some());
    }

    #[test]
    fn test_background_producer() {
        let node = VideoInput::new("clip.mp4");
        let slot = node.frame_slot();

        let producer = thread::spawn(move || {
            for width in 1..=5 {
                slot.publish(RgbaImage::new(width, 1));
            }
        });
        producer.join().unwrap();

        let frame = node.frame_slot().latest().unwrap();
        assert_eq!(frame.width(), 5);
    }

    #[test]
    fn test_source_payload() {
        let mut node = VideoInput::default();
        node.set_data("\"videos/intro.mp4\"").unwrap();
        assert_eq!(node.source, "videos/intro.mp4");
        assert_eq!(node.data().as_deref(), Some("\"videos/intro.mp4\""));
    }
}
