use std::future::Future;
use std::io;
use std::sync::Arc;

use stepwatch_activity::ObservationRegistry;
use tokio::task::JoinHandle;
use tokio_shutdown::Shutdown;
use tracing::{debug, warn};

use crate::config::{RenderMode, RendererConfig};
use crate::error::RenderError;
use crate::renderer::{LiveRenderer, PlainRenderer, Renderer};
use crate::surface::TerminalSurface;

/// Owns a registry and the renderer that displays it.
///
/// Dropping a tracker without [`Tracker::stop`] still cancels the renderer,
/// but does not wait for its final frame.
pub struct Tracker {
    registry: ObservationRegistry,
    renderer: Option<Box<dyn Renderer>>,
    shutdown: Arc<Shutdown>,
    task: Option<JoinHandle<Result<(), RenderError>>>,
}

impl Tracker {
    /// A tracker drawing to stdout, live or plain depending on `config.mode`.
    pub fn new(config: RendererConfig) -> Self {
        let renderer: Box<dyn Renderer> = match config.mode.resolve() {
            RenderMode::Plain => Box::new(PlainRenderer::new(io::stdout())),
            RenderMode::Auto | RenderMode::Live => {
                Box::new(LiveRenderer::new(TerminalSurface::stdout(), config))
            }
        };
        Self::from_boxed(renderer)
    }

    pub fn with_renderer(renderer: impl Renderer + 'static) -> Self {
        Self::from_boxed(Box::new(renderer))
    }

    fn from_boxed(renderer: Box<dyn Renderer>) -> Self {
        Self {
            registry: ObservationRegistry::new(),
            renderer: Some(renderer),
            shutdown: Shutdown::new(),
            task: None,
        }
    }

    pub fn registry(&self) -> &ObservationRegistry {
        &self.registry
    }

    /// The signal that stops the renderer. Triggering it directly has the
    /// same effect on the renderer as [`Tracker::stop`], without the wait.
    pub fn shutdown_handle(&self) -> Arc<Shutdown> {
        Arc::clone(&self.shutdown)
    }

    /// Start the renderer in the background. Only the first call has an
    /// effect; it must be made from within a tokio runtime.
    pub fn show(&mut self) {
        let Some(mut renderer) = self.renderer.take() else {
            debug!("Tracker already shown");
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("Tracker shown outside of a tokio runtime; nothing will be rendered");
            return;
        };

        let registry = self.registry.clone();
        let cancel = self.shutdown.cancellation_token();
        self.task = Some(runtime.spawn(async move { renderer.run(registry, cancel).await }));
    }

    /// Cancel the renderer and wait for its final frame.
    ///
    /// Renderer failures, including panics, are logged and discarded here so
    /// that a broken display never fails the workflow being tracked.
    /// Calling this more than once is harmless.
    pub async fn stop(&mut self) {
        self.shutdown.shutdown();
        self.renderer = None;

        let Some(task) = self.task.take() else {
            return;
        };
        match task.await.map_err(RenderError::from).and_then(|result| result) {
            Ok(()) => debug!("Renderer stopped"),
            Err(err) => warn!(error = %err, "Renderer failed; continuing without it"),
        }
    }

    /// Show the tracker, run `workflow` against its registry, then stop.
    pub async fn run<F, Fut, T>(mut self, workflow: F) -> T
    where
        F: FnOnce(ObservationRegistry) -> Fut,
        Fut: Future<Output = T>,
    {
        self.show();
        let output = workflow(self.registry.clone()).await;
        self.stop().await;
        output
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.shutdown.shutdown();
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("registry", &self.registry)
            .field("shown", &self.task.is_some())
            .field("stopped", &self.shutdown.is_cancelled())
            .finish()
    }
}
