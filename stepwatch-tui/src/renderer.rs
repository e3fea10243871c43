use std::io::Write;

use async_trait::async_trait;
use stepwatch_activity::{ActivityEvent, ObservationRegistry, RegistryEvent};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::RendererConfig;
use crate::console_log;
use crate::error::RenderError;
use crate::surface::LiveSurface;
use crate::view::RenderSnapshot;

/// The single consumer of a registry's state.
///
/// A renderer runs until `cancel` fires. Cancellation is normal termination:
/// the renderer brings its output up to date one last time and returns `Ok`.
#[async_trait]
pub trait Renderer: Send {
    async fn run(
        &mut self,
        registry: ObservationRegistry,
        cancel: CancellationToken,
    ) -> Result<(), RenderError>;
}

/// Redraws a status table and log feed on a [`LiveSurface`].
///
/// A frame is rebuilt on every refresh tick, which also advances the spinner,
/// and on every registry notification.
pub struct LiveRenderer<S> {
    surface: S,
    config: RendererConfig,
    frame: usize,
}

impl<S: LiveSurface> LiveRenderer<S> {
    pub fn new(surface: S, config: RendererConfig) -> Self {
        Self {
            surface,
            config,
            frame: 0,
        }
    }

    fn redraw(&mut self, registry: &ObservationRegistry) -> Result<(), RenderError> {
        let snapshot = RenderSnapshot::capture(registry, &self.config, self.frame);
        let (width, _) = self.surface.size();
        self.surface.draw(&snapshot.render(width))?;
        Ok(())
    }

    async fn render_loop(
        &mut self,
        registry: &ObservationRegistry,
        events: &mut broadcast::Receiver<RegistryEvent>,
        cancel: &CancellationToken,
    ) -> Result<(), RenderError> {
        self.redraw(registry)?;

        let mut ticker = tokio::time::interval(self.config.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        let mut events_open = true;
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                _ = ticker.tick() => {
                    self.frame = self.frame.wrapping_add(1);
                }

                event = events.recv(), if events_open => {
                    match event {
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            trace!(skipped, "Renderer lagged behind registry notifications");
                        }
                        Err(RecvError::Closed) => {
                            events_open = false;
                            continue;
                        }
                    }
                    // One rebuild covers every notification already queued.
                    loop {
                        match events.try_recv() {
                            Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                            Err(TryRecvError::Empty) => break,
                            Err(TryRecvError::Closed) => {
                                events_open = false;
                                break;
                            }
                        }
                    }
                }
            }

            self.redraw(registry)?;
        }

        debug!("Live renderer cancelled, drawing final frame");
        self.redraw(registry)
    }
}

#[async_trait]
impl<S: LiveSurface> Renderer for LiveRenderer<S> {
    async fn run(
        &mut self,
        registry: ObservationRegistry,
        cancel: CancellationToken,
    ) -> Result<(), RenderError> {
        // Subscribe before the first frame so nothing falls between the two.
        let mut events = registry.subscribe();

        self.surface.enter()?;
        let result = self.render_loop(&registry, &mut events, &cancel).await;
        drop(events);
        let exited = self.surface.exit();

        result?;
        exited?;
        Ok(())
    }
}

/// Appends one console line per registry notification.
///
/// Used where redrawing in place is not possible, such as when output is
/// piped to a file.
pub struct PlainRenderer<W> {
    out: W,
}

impl<W: Write + Send> PlainRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_event(
        &mut self,
        registry: &ObservationRegistry,
        event: &RegistryEvent,
    ) -> Result<(), RenderError> {
        let RegistryEvent::Activity(event) = event else {
            return Ok(());
        };
        let Some(entry) = registry.entry(event.id()) else {
            return Ok(());
        };
        let label = entry.description.as_deref().unwrap_or(&entry.name);

        let line = match event {
            ActivityEvent::Started { timestamp, .. } => {
                Some(console_log::step_started(*timestamp, label))
            }
            ActivityEvent::Stopped { timestamp, .. } => Some(console_log::step_completed(
                *timestamp,
                label,
                entry.duration().unwrap_or_default(),
            )),
            ActivityEvent::Progress {
                timestamp,
                value,
                message,
                ..
            } => console_log::progress(*timestamp, label, *value, message.as_deref()),
            ActivityEvent::Log {
                timestamp,
                level,
                message,
                ..
            } => Some(console_log::message(*timestamp, label, *level, message)),
        };

        if let Some(line) = line {
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }
}

#[async_trait]
impl<W: Write + Send> Renderer for PlainRenderer<W> {
    async fn run(
        &mut self,
        registry: ObservationRegistry,
        cancel: CancellationToken,
    ) -> Result<(), RenderError> {
        let mut events = registry.subscribe();

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                event = events.recv() => match event {
                    Ok(event) => self.write_event(&registry, &event)?,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Dropped activity notifications");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        // Notifications sent before cancellation still get their line.
        while let Ok(event) = events.try_recv() {
            self.write_event(&registry, &event)?;
        }
        self.out.flush()?;
        Ok(())
    }
}
