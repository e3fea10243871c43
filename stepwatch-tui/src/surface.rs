//! The terminal region the live renderer owns while it runs.

use std::io::{self, Write};

use crossterm::{cursor, queue, terminal};

const FALLBACK_SIZE: (u16, u16) = (120, 40);

/// A surface the live renderer draws whole frames onto.
///
/// `enter` is called once before the first frame and `exit` once after the
/// last, also when drawing failed in between.
pub trait LiveSurface: Send {
    fn enter(&mut self) -> io::Result<()>;

    /// Columns and rows available for one frame.
    fn size(&self) -> (usize, usize);

    /// Replace the previously drawn frame with `lines`.
    fn draw(&mut self, lines: &[String]) -> io::Result<()>;

    fn exit(&mut self) -> io::Result<()>;
}

/// Redraws frames inline below the cursor, without the alternate screen.
pub struct TerminalSurface<W: Write + Send> {
    out: W,
    /// Lines drawn by the previous frame, to move back over
    drawn: u16,
}

impl TerminalSurface<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out, drawn: 0 }
    }
}

impl<W: Write + Send> LiveSurface for TerminalSurface<W> {
    fn enter(&mut self) -> io::Result<()> {
        self.drawn = 0;
        queue!(self.out, cursor::Hide)?;
        self.out.flush()
    }

    fn size(&self) -> (usize, usize) {
        let (cols, rows) = terminal::size().unwrap_or(FALLBACK_SIZE);
        (usize::from(cols), usize::from(rows))
    }

    fn draw(&mut self, lines: &[String]) -> io::Result<()> {
        let (_, rows) = self.size();
        // The cursor cannot move above the top row, so a frame taller than the
        // screen would leave stale lines behind.
        let limit = rows.saturating_sub(1).max(1);
        let visible = if lines.len() > limit {
            &lines[..limit]
        } else {
            lines
        };

        if self.drawn > 0 {
            queue!(self.out, cursor::MoveToPreviousLine(self.drawn))?;
        }
        queue!(self.out, terminal::Clear(terminal::ClearType::FromCursorDown))?;
        for line in visible {
            write!(self.out, "{line}\r\n")?;
        }
        self.out.flush()?;

        self.drawn = u16::try_from(visible.len()).unwrap_or(u16::MAX);
        Ok(())
    }

    fn exit(&mut self) -> io::Result<()> {
        queue!(self.out, cursor::Show)?;
        self.out.flush()
    }
}
