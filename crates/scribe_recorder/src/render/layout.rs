//! Word-wrapped text layout for playback frames.

use super::FrameSink;
use scribe_core::{Color, Frame};
use serde::{Deserialize, Serialize};

/// Geometry of the playback surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Surface width in pixels.
    pub width: u32,
    /// Surface height in pixels.
    pub height: u32,
    /// Left and right inset.
    pub inset_x: f32,
    /// Baseline of the first line.
    pub baseline_y: f32,
    /// Distance between baselines.
    pub line_height: f32,
    /// Estimated glyph advance as a fraction of the text size.
    pub advance_ratio: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 520,
            inset_x: 28.0,
            baseline_y: 44.0,
            line_height: 30.0,
            advance_ratio: 0.55,
        }
    }
}

impl RenderConfig {
    /// Set custom dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Widest a line may get before it wraps.
    pub fn max_line_width(&self) -> f32 {
        (self.width as f32 - 2.0 * self.inset_x).max(0.0)
    }
}

/// One laid-out line of text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    pub x: f32,
    /// Baseline position.
    pub y: f32,
    pub width: f32,
}

/// A fully laid-out frame, ready to draw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderedFrame {
    pub width: u32,
    pub height: u32,
    pub color: Color,
    pub size_pt: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient: Option<String>,
    pub lines: Vec<TextLine>,
}

impl RenderedFrame {
    /// Lines whose baseline falls inside the surface.
    pub fn visible_lines(&self) -> impl Iterator<Item = &TextLine> {
        let height = self.height as f32;
        self.lines.iter().filter(move |line| line.y <= height)
    }

    /// The drawn text, one line per row.
    pub fn to_plain_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Lays frames out onto a surface of known size.
#[derive(Clone, Debug, Default)]
pub struct TextLayout {
    config: RenderConfig,
}

impl TextLayout {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Estimated width of `text` at `size_pt`.
    ///
    /// Every glyph is assumed to advance `advance_ratio * size_pt`; no font is
    /// shaped, so wide scripts and proportional fonts drift from real widths.
    pub fn measure(&self, text: &str, size_pt: f32) -> f32 {
        text.chars().count() as f32 * size_pt * self.config.advance_ratio
    }

    /// Lay out `frame`, wrapping on spaces and breaking on newlines.
    pub fn layout(&self, frame: &Frame) -> RenderedFrame {
        let size = frame.style.size_pt;
        let max_width = self.config.max_line_width();
        let x = self.config.inset_x;
        let mut y = self.config.baseline_y;
        let mut lines = Vec::new();

        for paragraph in frame.text.split('\n') {
            let mut line = String::new();
            for word in paragraph.split(' ') {
                let candidate = format!("{line}{word} ");
                if !line.is_empty() && self.measure(&candidate, size) > max_width {
                    lines.push(self.line(&line, x, y, size));
                    line = format!("{word} ");
                    y += self.config.line_height;
                } else {
                    line = candidate;
                }
            }
            lines.push(self.line(&line, x, y, size));
            y += self.config.line_height;
        }

        RenderedFrame {
            width: self.config.width,
            height: self.config.height,
            color: frame.style.color,
            size_pt: size,
            gradient: frame.style.gradient.clone(),
            lines,
        }
    }

    fn line(&self, text: &str, x: f32, y: f32, size_pt: f32) -> TextLine {
        let text = text.trim_end_matches(' ').to_string();
        let width = self.measure(&text, size_pt);
        TextLine { text, x, y, width }
    }
}

/// A sink that keeps only the latest laid-out frame.
#[derive(Debug, Default)]
pub struct LayoutSink {
    layout: TextLayout,
    current: Option<RenderedFrame>,
    frames_drawn: u64,
}

impl LayoutSink {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            layout: TextLayout::new(config),
            current: None,
            frames_drawn: 0,
        }
    }

    /// What is on the surface right now.
    pub fn current(&self) -> Option<&RenderedFrame> {
        self.current.as_ref()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }
}

impl FrameSink for LayoutSink {
    fn render(&mut self, frame: &Frame) {
        self.current = Some(self.layout.layout(frame));
        self.frames_drawn += 1;
    }
}
