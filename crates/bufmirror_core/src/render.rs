//! Display sinks for buffer snapshots.

use std::io::{self, Write};

/// Clears the screen and homes the cursor.
const CLEAR_SCREEN: &[u8] = b"\x1b[2J\x1b[H";

/// Receives the full content after every applied edit.
pub trait RenderSink {
    /// Replace whatever was shown before with `content`.
    ///
    /// Invalid UTF-8 is shown lossily and never fails the render.
    ///
    /// # Errors
    /// Returns the underlying I/O error when the display cannot be written.
    fn render(&mut self, content: &[u8]) -> io::Result<()>;
}

/// Writes clear-and-redraw frames to a terminal stream.
pub struct TerminalSink<W> {
    out: W,
    clear: bool,
}

impl<W: Write> TerminalSink<W> {
    /// Wrap `out`; `clear` controls whether each frame starts with a screen clear.
    pub fn new(out: W, clear: bool) -> Self {
        Self { out, clear }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl TerminalSink<io::Stdout> {
    pub fn stdout(clear: bool) -> Self {
        Self::new(io::stdout(), clear)
    }
}

impl<W: Write> RenderSink for TerminalSink<W> {
    fn render(&mut self, content: &[u8]) -> io::Result<()> {
        if self.clear {
            self.out.write_all(CLEAR_SCREEN)?;
        }
        self.out
            .write_all(String::from_utf8_lossy(content).as_bytes())?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

/// Keeps every rendered frame in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    frames: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    /// Most recent frame, if anything was rendered.
    pub fn last(&self) -> Option<&str> {
        self.frames.last().map(String::as_str)
    }
}

impl RenderSink for MemorySink {
    fn render(&mut self, content: &[u8]) -> io::Result<()> {
        self.frames
            .push(String::from_utf8_lossy(content).into_owned());
        Ok(())
    }
}

impl<T: RenderSink + ?Sized> RenderSink for &mut T {
    fn render(&mut self, content: &[u8]) -> io::Result<()> {
        (**self).render(content)
    }
}
