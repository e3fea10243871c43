//! Simulated release workflow that exercises the tracker end to end.
//!
//! ```sh
//! cargo run --bin stepwatch-demo -- --fail-step publish
//! ```

use std::io::{IsTerminal, stderr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use rand::Rng;
use stepwatch_activity::{Activity, LogLevel, ObservationRegistry};
use stepwatch_tui::{RenderMode, RendererConfig, Tracker};
use tokio::task::JoinSet;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Auto,
    Live,
    Plain,
}

impl From<Mode> for RenderMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Auto => RenderMode::Auto,
            Mode::Live => RenderMode::Live,
            Mode::Plain => RenderMode::Plain,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "stepwatch-demo", about = "Watch a simulated release run")]
struct Args {
    /// How to present progress
    #[arg(long, value_enum, default_value_t = Mode::Auto)]
    mode: Mode,

    /// Spinner refresh interval in milliseconds
    #[arg(long, default_value_t = 100)]
    refresh_ms: u64,

    /// Width of the progress message column
    #[arg(long, default_value_t = 50)]
    message_width: usize,

    /// Number of log lines kept on screen
    #[arg(long, default_value_t = 20)]
    log_tail: usize,

    /// Make the named step fail
    #[arg(long)]
    fail_step: Option<String>,

    /// Scale every simulated delay by this factor
    #[arg(long, default_value_t = 1.0)]
    speed: f64,
}

struct Step {
    name: &'static str,
    description: &'static str,
    units: u32,
}

const PREPARE: &[Step] = &[
    Step {
        name: "git",
        description: "Checking git state",
        units: 4,
    },
    Step {
        name: "version",
        description: "Resolving next version",
        units: 3,
    },
];

/// Run concurrently once preparation is done.
const VERIFY: &[Step] = &[
    Step {
        name: "build",
        description: "Building release artifacts",
        units: 12,
    },
    Step {
        name: "test",
        description: "Running test suite",
        units: 16,
    },
    Step {
        name: "lint",
        description: "Linting sources",
        units: 6,
    },
];

const SHIP: &[Step] = &[
    Step {
        name: "package",
        description: "Packing crate",
        units: 5,
    },
    Step {
        name: "publish",
        description: "Publishing to registry",
        units: 8,
    },
];

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::WARN.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(stderr)
        .with_ansi(stderr().is_terminal())
        .init();
}

/// Drive one step to completion. Dropping the activity at the end stops it.
async fn simulate(activity: Activity, step: &Step, args: &Args) -> Result<()> {
    activity.start_with("starting");
    for unit in 1..=step.units {
        let jitter = rand::thread_rng().gen_range(60..240);
        tokio::time::sleep(Duration::from_millis(jitter).mul_f64(args.speed.max(0.0))).await;

        if args.fail_step.as_deref() == Some(step.name) && unit * 2 > step.units {
            activity.log(LogLevel::Stderr, format!("{}: unexpected status 403", step.name));
            activity.log(LogLevel::Error, format!("{} failed", step.description));
            activity.fail();
            activity.report_message("failed");
            bail!("step {} failed", step.name);
        }

        let message = format!("{} {unit}/{}", step.name, step.units);
        activity.report(f64::from(unit) / f64::from(step.units), Some(&message));
        if unit % 3 == 0 {
            activity.log(LogLevel::Stdout, format!("{}: finished unit {unit}", step.name));
        }
    }
    activity.log(LogLevel::Success, format!("{} succeeded", step.description));
    activity.report_message("done");
    Ok(())
}

fn announce(
    registry: &ObservationRegistry,
    steps: &'static [Step],
) -> Result<Vec<(Activity, &'static Step)>> {
    let mut announced = Vec::with_capacity(steps.len());
    for step in steps {
        announced.push((registry.announce(step.name, Some(step.description))?, step));
    }
    Ok(announced)
}

async fn release(registry: ObservationRegistry, args: Args) -> Result<()> {
    // Announce everything up front so the table shows the whole plan.
    let prepare = announce(&registry, PREPARE)?;
    let verify = announce(&registry, VERIFY)?;
    let ship = announce(&registry, SHIP)?;

    for (activity, step) in prepare {
        simulate(activity, step, &args).await?;
    }

    let args = Arc::new(args);
    let mut tasks = JoinSet::new();
    for (activity, step) in verify {
        let args = args.clone();
        tasks.spawn(async move { simulate(activity, step, &args).await });
    }
    while let Some(result) = tasks.join_next().await {
        result.context("verification task panicked")??;
    }

    for (activity, step) in ship {
        simulate(activity, step, &args).await?;
    }

    info!("Release finished");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let config = RendererConfig::default()
        .refresh_interval(Duration::from_millis(args.refresh_ms))
        .message_width(args.message_width)
        .log_tail(args.log_tail)
        .mode(args.mode.into());
    debug!(?config, "Starting demo");

    let mut tracker = Tracker::new(config);
    tracker.show();

    // Finishing the workflow, successfully or not, cancels the renderer.
    let workflow = tracker
        .shutdown_handle()
        .shutdown_when_done(release(tracker.registry().clone(), args));
    let outcome = workflow.await.context("release workflow panicked")?;
    tracker.stop().await;

    outcome.unwrap_or(Ok(()))
}
