use std::io::IsTerminal;
use std::time::Duration;

/// How a tracker presents activity state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Live view when stdout is a terminal, plain lines otherwise
    #[default]
    Auto,
    /// Redraw a status table and log feed in place
    Live,
    /// Append one line per notification
    Plain,
}

impl RenderMode {
    /// Resolve `Auto` against the current stdout.
    pub fn resolve(self) -> RenderMode {
        match self {
            RenderMode::Auto if std::io::stdout().is_terminal() => RenderMode::Live,
            RenderMode::Auto => RenderMode::Plain,
            mode => mode,
        }
    }
}

/// Configuration for the renderers.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Spinner cadence of the live view
    pub refresh_interval: Duration,
    /// Fixed width of the progress message column
    pub message_width: usize,
    /// Number of most recent log records shown in the log pane
    pub log_tail: usize,
    pub mode: RenderMode,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_millis(100),
            message_width: 50,
            log_tail: 20,
            mode: RenderMode::Auto,
        }
    }
}

impl RendererConfig {
    /// Set the spinner refresh interval. Zero is raised to one millisecond.
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Set the width of the progress message column.
    pub fn message_width(mut self, width: usize) -> Self {
        self.message_width = width;
        self
    }

    /// Set how many log records the log pane keeps on screen.
    pub fn log_tail(mut self, n: usize) -> Self {
        self.log_tail = n;
        self
    }

    pub fn mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }
}
