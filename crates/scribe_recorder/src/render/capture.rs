//! Frame capture for export.

use super::{FrameSink, RenderConfig, RenderedFrame, TextLayout};
use scribe_core::Frame;

/// A laid-out frame tagged with its position in a capture.
#[derive(Clone, Debug, PartialEq)]
pub struct CapturedFrame {
    /// Index in the capture, starting at 0.
    pub frame_number: u64,
    pub rendered: RenderedFrame,
}

impl CapturedFrame {
    pub fn new(rendered: RenderedFrame) -> Self {
        Self {
            frame_number: 0,
            rendered,
        }
    }

    pub fn with_frame_number(mut self, frame: u64) -> Self {
        self.frame_number = frame;
        self
    }

    /// Same drawing, regardless of where in the sequence it sits.
    pub fn is_identical_to(&self, other: &CapturedFrame) -> bool {
        self.rendered == other.rendered
    }
}

/// An ordered run of captured frames with a hard upper bound.
#[derive(Clone, Debug)]
pub struct FrameSequence {
    frames: Vec<CapturedFrame>,
    max_frames: usize,
    dropped: u64,
}

impl FrameSequence {
    pub fn new(max_frames: usize) -> Self {
        Self {
            frames: Vec::with_capacity(max_frames.min(1000)),
            max_frames,
            dropped: 0,
        }
    }

    /// Add a frame. Frames past the bound are counted and discarded.
    pub fn push(&mut self, frame: CapturedFrame) -> bool {
        if self.frames.len() < self.max_frames {
            self.frames.push(frame);
            true
        } else {
            self.dropped += 1;
            false
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() >= self.max_frames
    }

    /// Frames refused because the sequence was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn get(&self, index: usize) -> Option<&CapturedFrame> {
        self.frames.get(index)
    }

    pub fn last(&self) -> Option<&CapturedFrame> {
        self.frames.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapturedFrame> {
        self.frames.iter()
    }

    /// Number of times the drawing changes from one frame to the next.
    pub fn distinct_transitions(&self) -> usize {
        self.frames
            .windows(2)
            .filter(|pair| !pair[0].is_identical_to(&pair[1]))
            .count()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.dropped = 0;
    }

    pub fn into_frames(self) -> Vec<CapturedFrame> {
        self.frames
    }
}

/// Lays out every frame it is handed and appends it to a [`FrameSequence`].
#[derive(Debug)]
pub struct CaptureSink {
    layout: TextLayout,
    sequence: FrameSequence,
    next_frame: u64,
}

impl CaptureSink {
    pub fn new(config: RenderConfig, max_frames: usize) -> Self {
        Self {
            layout: TextLayout::new(config),
            sequence: FrameSequence::new(max_frames),
            next_frame: 0,
        }
    }

    pub fn sequence(&self) -> &FrameSequence {
        &self.sequence
    }

    /// Append `count` copies of the most recent frame, e.g. to hold the
    /// final state on screen for a moment.
    pub fn repeat_last(&mut self, count: usize) {
        let Some(last) = self.sequence.last().map(|f| f.rendered.clone()) else {
            return;
        };
        for _ in 0..count {
            if !self.push(last.clone()) {
                break;
            }
        }
    }

    /// Hand back the captured frames and start a fresh sequence.
    pub fn take_sequence(&mut self) -> FrameSequence {
        let max = self.sequence.max_frames;
        self.next_frame = 0;
        std::mem::replace(&mut self.sequence, FrameSequence::new(max))
    }

    fn push(&mut self, rendered: RenderedFrame) -> bool {
        let frame = CapturedFrame::new(rendered).with_frame_number(self.next_frame);
        let stored = self.sequence.push(frame);
        if stored {
            self.next_frame += 1;
        }
        stored
    }
}

impl FrameSink for CaptureSink {
    fn render(&mut self, frame: &Frame) {
        let rendered = self.layout.layout(frame);
        if !self.push(rendered) && self.sequence.dropped() == 1 {
            tracing::warn!(max = self.sequence.max_frames, "capture full, dropping frames");
        }
    }
}
