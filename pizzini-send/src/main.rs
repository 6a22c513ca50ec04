//! pizzini-send - Background daemon that publishes pizzini on schedule
//!
//! Builds the schedule from the configuration (or resumes the saved one),
//! runs the scheduler until a shutdown signal arrives, then saves the
//! schedule snapshot so the next start picks up where this one stopped.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use libpizzini::coordinator::{Automation, LogPublisher};
use libpizzini::logging::LoggingConfig;
use libpizzini::scheduling::{JobOutcome, SchedulerConfig};
use libpizzini::{Config, EntryCatalog, EntryId, PizziniError, PostScheduler};
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Seconds between snapshot saves while the daemon runs
const SNAPSHOT_INTERVAL_SECS: u64 = 300;

#[derive(Parser, Debug)]
#[command(name = "pizzini-send")]
#[command(version)]
#[command(about = "Background daemon that publishes pizzini on schedule")]
#[command(long_about = "\
pizzini-send - Background daemon that publishes pizzini on schedule

DESCRIPTION:
    pizzini-send is a long-running daemon. It reads the entries file,
    builds a recurring or random weekly schedule from the configuration
    and publishes each entry to the configured platforms when its time
    comes.

    The schedule and the set of already posted entries are saved to a
    snapshot file on shutdown. On the next start the snapshot is resumed
    instead of building a fresh schedule, unless --fresh is given.

USAGE:
    # Run in foreground (logs to stderr)
    pizzini-send

    # Check for due posts every 30 seconds
    pizzini-send --poll-interval 30s

    # Discard the saved schedule and rebuild it from the config
    pizzini-send --fresh

    # Show what is scheduled and exit
    pizzini-send --status

SIGNALS:
    SIGTERM, SIGINT - Graceful shutdown (finishes posts in flight)

CONFIGURATION:
    Configuration file: ~/.config/pizzini/config.toml
    Snapshot location: ~/.local/share/pizzini/schedule.json

    [scheduling]
    enabled = true
    mode = \"recurring\"      # or \"random\"
    poll_interval = 60      # seconds between checks

    [scheduling.recurring]
    interval_days = 7
    start_time = \"09:00\"

EXIT CODES:
    0 - Clean shutdown
    1 - Runtime error
    2 - Configuration or entries file error
    3 - Invalid input
")]
struct Cli {
    /// Poll interval, e.g. 30s or 2m (overrides config)
    #[arg(long, value_name = "DURATION", value_parser = parse_poll_interval)]
    poll_interval: Option<Duration>,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Ignore the saved snapshot and build the schedule from the config
    #[arg(long)]
    fresh: bool,

    /// Print the scheduler status as JSON and exit
    #[arg(long, conflicts_with = "once")]
    status: bool,

    /// Run due posts once and exit (for testing)
    #[arg(long, hide = true)]
    once: bool,
}

/// Accepts humantime durations; a bare number means seconds
fn parse_poll_interval(value: &str) -> std::result::Result<Duration, String> {
    let interval = match value.trim().parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => humantime::parse_duration(value.trim()).map_err(|e| e.to_string())?,
    };
    if interval.is_zero() {
        return Err("poll interval must be greater than zero".to_string());
    }
    Ok(interval)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    LoggingConfig::from_env(cli.verbose).init();

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

/// Exit code of the library error behind `e`, or 1
fn exit_code(e: &anyhow::Error) -> i32 {
    e.chain()
        .find_map(|cause| cause.downcast_ref::<PizziniError>())
        .map(PizziniError::exit_code)
        .unwrap_or(1)
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let entries_path = config.entries_path();
    let catalog = EntryCatalog::load_from_path(&entries_path)
        .with_context(|| format!("Failed to load entries from {}", entries_path.display()))?;
    let snapshot_path = config.snapshot_path()?;

    if !config.posting.dry_run {
        warn!("No platform clients are configured; posts will only be logged");
    }

    let poll_interval = cli
        .poll_interval
        .unwrap_or_else(|| Duration::from_secs(config.scheduling.poll_interval));
    info!("Poll interval: {}", humantime::format_duration(poll_interval));

    let eligible = config.eligible_entry_ids(&catalog.ids());
    info!(
        entries = catalog.len(),
        eligible = eligible.len(),
        "Loaded entries"
    );

    let automation = Arc::new(Automation::new(
        catalog,
        Arc::new(LogPublisher),
        config.posting.include_hashtags,
    ));
    let scheduler = PostScheduler::with_config(automation, SchedulerConfig { poll_interval });

    if !prepare_schedule(&scheduler, &config, &eligible, &snapshot_path, cli.fresh) {
        warn!("Nothing scheduled, exiting");
        return Ok(());
    }

    if cli.status {
        let status = scheduler.get_scheduler_status();
        println!(
            "{}",
            serde_json::to_string_pretty(&status).context("Failed to serialize status")?
        );
        return Ok(());
    }

    if cli.once {
        let outcomes = scheduler
            .run_pending_at(chrono::Local::now().naive_local())
            .await;
        log_outcomes(&outcomes);
        scheduler.save_schedule_config(&snapshot_path);
        info!("pizzini-send: processed due posts once, exiting");
        return Ok(());
    }

    info!("pizzini-send daemon starting");
    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(shutdown.clone())?;

    if !scheduler.start_scheduler() {
        anyhow::bail!("Scheduler failed to start");
    }
    for post in scheduler.get_next_posts(3) {
        info!(next_run = %post.next_run, tags = ?post.tags, "Upcoming: {}", post.job_info);
    }

    wait_for_shutdown(&scheduler, &snapshot_path, shutdown).await;

    scheduler.stop_scheduler().await;
    scheduler.save_schedule_config(&snapshot_path);
    info!("pizzini-send daemon stopped");
    Ok(())
}

/// Resume the saved schedule, or build one from the config
///
/// Returns `false` when there is nothing to run.
fn prepare_schedule(
    scheduler: &PostScheduler,
    config: &Config,
    entry_ids: &[EntryId],
    snapshot_path: &Path,
    fresh: bool,
) -> bool {
    if !config.scheduling.enabled {
        warn!("Scheduling is disabled in the configuration ([scheduling] enabled = false)");
        return false;
    }

    if !fresh && snapshot_path.exists() && scheduler.load_schedule_config(snapshot_path) {
        let status = scheduler.get_scheduler_status();
        if status.scheduled_jobs > 0 {
            info!(
                jobs = status.scheduled_jobs,
                posted = status.posted_content_count,
                "Resumed saved schedule"
            );
            return true;
        }
        warn!("Saved schedule is empty, rebuilding from config");
    }

    Automation::schedule_from_config(scheduler, config, entry_ids)
}

fn log_outcomes(outcomes: &[JobOutcome]) {
    if outcomes.is_empty() {
        info!("No posts due");
    }
    for outcome in outcomes {
        match outcome {
            JobOutcome::Posted(id) => info!(entry_id = id, "Posted"),
            JobOutcome::Failed(id) => warn!(entry_id = id, "Post failed"),
            JobOutcome::Skipped => info!("Nothing left to post"),
            JobOutcome::InFlight => info!("Previous run still in flight"),
        }
    }
}

/// Block until shutdown is requested, saving the snapshot periodically
async fn wait_for_shutdown(scheduler: &PostScheduler, snapshot_path: &Path, shutdown: Arc<AtomicBool>) {
    let mut elapsed = 0;
    while !shutdown.load(Ordering::Relaxed) {
        sleep(Duration::from_secs(1)).await;
        elapsed += 1;
        if elapsed % SNAPSHOT_INTERVAL_SECS == 0 {
            scheduler.save_schedule_config(snapshot_path);
        }
    }
    info!("Shutdown requested, stopping scheduler");
}

/// Set up signal handlers for graceful shutdown
#[cfg(unix)]
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Signal setup failed")?;

    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            info!(signal = sig, "Received shutdown signal, stopping gracefully...");
            shutdown.store(true, Ordering::Relaxed);
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> Result<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, stopping gracefully...");
            shutdown.store(true, Ordering::Relaxed);
        }
    });
    Ok(())
}
