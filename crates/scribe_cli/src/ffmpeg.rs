//! Transcoding captured frames with an external `ffmpeg`.
//!
//! Captured frames are display lists rather than pixels, so they are written
//! out as an ASS subtitle script and burned onto a solid background by
//! ffmpeg's `subtitles` filter. The container settings come from
//! [`ExportFormat::transcoder_args`].

use scribe_recorder::{ExportError, ExportFormat, FrameSequence, RenderedFrame, Transcoder};
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Canvas colour behind the text.
const BACKGROUND: &str = "0x111114";

/// Runs `ffmpeg` (or a compatible binary) once per export.
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(
        &mut self,
        frames: &FrameSequence,
        fps: u32,
        format: ExportFormat,
    ) -> Result<Vec<u8>, ExportError> {
        let Some(first) = frames.get(0) else {
            return Err(ExportError::NoFrames);
        };
        let fps = fps.max(1);
        let (width, height) = (first.rendered.width, first.rendered.height);

        let dir = tempfile::tempdir()?;
        let script = dir.path().join("frames.ass");
        fs::write(&script, subtitle_script(frames, fps))?;
        let output = dir.path().join(format.file_name());

        let seconds = frames.len() as f64 / fps as f64;
        let source = format!(
            "color=c={BACKGROUND}:s={width}x{height}:r={fps}:d={seconds:.3},subtitles='{}'",
            script.display()
        );
        let mut args = vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-f".to_string(),
            "lavfi".to_string(),
        ];
        args.extend(format.transcoder_args(&source, &output.to_string_lossy()));

        tracing::debug!(program = %self.program.display(), ?args, "running transcoder");
        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ExportError::Transcoder(format!(
                "{} exited with {}: {}",
                self.program.display(),
                result.status,
                stderr.trim()
            )));
        }

        Ok(fs::read(&output)?)
    }
}

/// One dialogue line per visible text line for each run of identical frames.
pub fn subtitle_script(frames: &FrameSequence, fps: u32) -> String {
    let fps = u64::from(fps.max(1));
    let (width, height) = frames
        .get(0)
        .map(|f| (f.rendered.width, f.rendered.height))
        .unwrap_or((0, 0));

    let mut script = format!(
        "[Script Info]\n\
         ScriptType: v4.00+\n\
         PlayResX: {width}\n\
         PlayResY: {height}\n\
         WrapStyle: 2\n\
         \n\
         [V4+ Styles]\n\
         Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
         Style: Default,Sans,22,&H00FFFFFF,&H00FFFFFF,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,0,0,7,0,0,0,1\n\
         \n\
         [Events]\n\
         Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n"
    );

    let all: Vec<_> = frames.iter().collect();
    let mut start = 0;
    while start < all.len() {
        let mut end = start + 1;
        while end < all.len() && all[end].is_identical_to(all[start]) {
            end += 1;
        }
        let from = ass_time(start as u64 * 1000 / fps);
        let to = ass_time(end as u64 * 1000 / fps);
        push_dialogue(&mut script, &all[start].rendered, &from, &to);
        start = end;
    }
    script
}

fn push_dialogue(script: &mut String, rendered: &RenderedFrame, from: &str, to: &str) {
    let [r, g, b, a] = rendered.color.to_rgba8();
    for line in rendered.visible_lines().filter(|line| !line.text.is_empty()) {
        // Writing to a String cannot fail.
        let _ = writeln!(
            script,
            "Dialogue: 0,{from},{to},Default,,0,0,0,,{{\\an1\\pos({:.0},{:.0})\\fs{:.0}\\1c&H{b:02X}{g:02X}{r:02X}&\\1a&H{:02X}&}}{}",
            line.x,
            line.y,
            rendered.size_pt,
            255 - a,
            escape_text(&line.text)
        );
    }
}

/// `h:mm:ss.cc`
fn ass_time(ms: u64) -> String {
    format!(
        "{}:{:02}:{:02}.{:02}",
        ms / 3_600_000,
        ms / 60_000 % 60,
        ms / 1000 % 60,
        ms % 1000 / 10
    )
}

/// Keep typed braces and backslashes from being read as override tags.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\u{2060}"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            _ => out.push(c),
        }
    }
    out
}
