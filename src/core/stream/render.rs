//! Terminal rendering of display lines
//!
//! Power readings (`INA:...`) arrive several times a second. They overwrite
//! each other on one terminal row instead of scrolling. Any other line is
//! padded to the widest reading seen so far so it fully covers a half-drawn
//! reading before the newline.

use std::io::{self, Write};

/// Prefix of the measurement lines that overwrite themselves in place
pub const REPEATING_PREFIX: &str = "INA:";

/// Is `line` a measurement that overwrites itself in place?
pub fn is_repeating(line: &str) -> bool {
    line.starts_with(REPEATING_PREFIX)
}

/// Output surface for display lines
pub trait Renderer {
    /// Draw `text` over the current row, leaving the cursor at its start
    fn write_in_place(&mut self, text: &str) -> io::Result<()>;

    /// Draw `text` and move to a new row
    fn write_line(&mut self, text: &str) -> io::Result<()>;
}

/// Renderer writing carriage-return/newline terminated text
pub struct TerminalRenderer<W: Write> {
    out: W,
}

impl TerminalRenderer<io::Stdout> {
    /// Render to the process' stdout
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalRenderer<W> {
    /// Render to any writer
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn write_in_place(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "{text}\r")?;
        self.out.flush()
    }

    fn write_line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }
}

/// One call made on a [`RecordingRenderer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderCall {
    /// `write_in_place`
    InPlace(String),
    /// `write_line`
    Line(String),
}

/// Renderer that records calls instead of drawing
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    /// Calls in order
    pub calls: Vec<RenderCall>,
}

impl RecordingRenderer {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes a terminal would have received
    pub fn transcript(&self) -> String {
        self.calls
            .iter()
            .map(|call| match call {
                RenderCall::InPlace(text) => format!("{text}\r"),
                RenderCall::Line(text) => format!("{text}\n"),
            })
            .collect()
    }
}

impl Renderer for RecordingRenderer {
    fn write_in_place(&mut self, text: &str) -> io::Result<()> {
        self.calls.push(RenderCall::InPlace(text.to_string()));
        Ok(())
    }

    fn write_line(&mut self, text: &str) -> io::Result<()> {
        self.calls.push(RenderCall::Line(text.to_string()));
        Ok(())
    }
}

/// Applies the overwrite/padding policy on top of a [`Renderer`]
pub struct LineRenderer<R: Renderer> {
    inner: R,
    max_width: usize,
}

impl<R: Renderer> LineRenderer<R> {
    /// Wrap a renderer
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            max_width: 0,
        }
    }

    /// Widest repeating line seen so far, in characters
    pub fn max_width(&self) -> usize {
        self.max_width
    }

    /// Borrow the wrapped renderer
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Recover the wrapped renderer
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Draw one display line
    pub fn render(&mut self, line: &str) -> io::Result<()> {
        let width = line.chars().count();

        if is_repeating(line) {
            self.max_width = self.max_width.max(width);
            return self.inner.write_in_place(line);
        }

        if width < self.max_width {
            let padded = format!("{line:<pad$}", pad = self.max_width);
            self.inner.write_line(&padded)
        } else {
            self.inner.write_line(line)
        }
    }
}
