//! Terminal presentation of an [`ObservationRegistry`](stepwatch_activity::ObservationRegistry).
//!
//! A [`Tracker`] owns a registry and a [`Renderer`]. The [`LiveRenderer`]
//! redraws a status table next to a rolling log feed; the [`PlainRenderer`]
//! writes one line per notification for non-interactive output.
//!
//! ```no_run
//! use stepwatch_tui::{RendererConfig, Tracker};
//!
//! # async fn example() {
//! let tracker = Tracker::new(RendererConfig::default());
//! tracker
//!     .run(|registry| async move {
//!         let build = registry.start("build", Some("Building")).unwrap();
//!         build.report(0.5, Some("halfway"));
//!         build.stop_with("done");
//!     })
//!     .await;
//! # }
//! ```

pub mod components;
pub mod config;
pub mod console_log;
pub mod error;
pub mod renderer;
pub mod surface;
pub mod tracker;
pub mod view;

pub use config::{RenderMode, RendererConfig};
pub use error::RenderError;
pub use renderer::{LiveRenderer, PlainRenderer, Renderer};
pub use surface::{LiveSurface, TerminalSurface};
pub use tracker::Tracker;
pub use view::{LogLine, RenderSnapshot, StatusRow};
