//! The seam between playback and a drawing surface.
//!
//! Playback hands each reconstructed [`Frame`] to a [`FrameSink`]. The
//! sinks in this module lay text out the way the playback canvas draws it
//! (left-aligned, word-wrapped from a fixed inset) and optionally keep the
//! results for export.

mod capture;
mod layout;

pub use capture::{CaptureSink, CapturedFrame, FrameSequence};
pub use layout::{LayoutSink, RenderConfig, RenderedFrame, TextLayout, TextLine};

use parking_lot::Mutex;
use scribe_core::Frame;
use std::sync::Arc;

/// Receives frames from the playback scheduler.
///
/// Rendering the same frame twice must produce the same output, and each
/// call fully replaces whatever the previous call drew.
pub trait FrameSink: Send {
    fn render(&mut self, frame: &Frame);
}

/// Shared sinks let the caller inspect what was drawn while playback owns
/// the other handle.
impl<T: FrameSink> FrameSink for Arc<Mutex<T>> {
    fn render(&mut self, frame: &Frame) {
        self.lock().render(frame);
    }
}
