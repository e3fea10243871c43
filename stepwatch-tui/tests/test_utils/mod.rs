//! Test doubles for the renderer's output side.

#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use stepwatch_tui::LiveSurface;
use tokio_util::sync::CancellationToken;

/// One frame as handed to the surface.
#[derive(Debug, Clone)]
pub struct RecordedFrame {
    pub lines: Vec<String>,
    /// Whether cancellation had been requested when the frame was drawn
    pub after_cancel: bool,
}

#[derive(Debug, Default)]
pub struct Recording {
    pub entered: usize,
    pub exited: usize,
    pub frames: Vec<RecordedFrame>,
}

impl Recording {
    pub fn frames_after_cancel(&self) -> usize {
        self.frames.iter().filter(|f| f.after_cancel).count()
    }

    pub fn last_text(&self) -> String {
        self.frames
            .last()
            .map(|f| {
                f.lines
                    .iter()
                    .map(|l| console::strip_ansi_codes(l).into_owned())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }
}

/// A [`LiveSurface`] that keeps every frame in memory.
#[derive(Clone)]
pub struct RecordingSurface {
    pub recording: Arc<Mutex<Recording>>,
    cancel: CancellationToken,
    width: usize,
    /// Fail every draw after this many successful ones
    fail_after: Option<usize>,
    panic_on_draw: bool,
}

impl RecordingSurface {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            recording: Arc::default(),
            cancel,
            width: 100,
            fail_after: None,
            panic_on_draw: false,
        }
    }

    pub fn failing_after(mut self, draws: usize) -> Self {
        self.fail_after = Some(draws);
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_draw = true;
        self
    }

    pub fn recording(&self) -> std::sync::MutexGuard<'_, Recording> {
        self.recording.lock().unwrap()
    }
}

impl LiveSurface for RecordingSurface {
    fn enter(&mut self) -> io::Result<()> {
        self.recording().entered += 1;
        Ok(())
    }

    fn size(&self) -> (usize, usize) {
        (self.width, 40)
    }

    fn draw(&mut self, lines: &[String]) -> io::Result<()> {
        if self.panic_on_draw {
            panic!("surface exploded");
        }
        let after_cancel = self.cancel.is_cancelled();
        let mut recording = self.recording();
        if self.fail_after.is_some_and(|n| recording.frames.len() >= n) {
            return Err(io::Error::other("terminal went away"));
        }
        recording.frames.push(RecordedFrame {
            lines: lines.to_vec(),
            after_cancel,
        });
        Ok(())
    }

    fn exit(&mut self) -> io::Result<()> {
        self.recording().exited += 1;
        Ok(())
    }
}

/// A cloneable in-memory writer.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        console::strip_ansi_codes(&String::from_utf8_lossy(&bytes))
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
