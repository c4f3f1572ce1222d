//! CLI entry point for the live-reload engine.
//!
//! This binary watches the script plugins listed in a host session file and
//! triggers a reload whenever their source files change.
//!
//! # Usage
//!
//! ```bash
//! live-reload [OPTIONS] <COMMAND>
//!
//! # List watched plugins and their files
//! live-reload --host-root ~/Host --creator me scan
//!
//! # Watch and reload until Ctrl-C
//! live-reload --host-root ~/Host --creator me --reload-cmd "./reload.sh" watch
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod host;

use std::io::Write;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use lr_core::Config;
use lr_scanner::{DiskFileSystem, FileSystem};
use lr_watcher::{Engine, PluginHost};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::host::SessionFileHost;

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Live reload for script plugins.
///
/// Watches the source directories of the plugins listed in a host session
/// file and reloads a plugin whenever one of its files changes.
#[derive(Parser)]
#[command(name = "live-reload", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file. Flags override its values.
    #[arg(short, long, global = true, env = "LIVE_RELOAD_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Session file listing the loaded plugins.
    ///
    /// Defaults to `session.json` inside the host root.
    #[arg(short, long, global = true, env = "LIVE_RELOAD_SESSION")]
    session: Option<Utf8PathBuf>,

    /// Directory that plugin paths are relative to.
    #[arg(long, global = true, env = "LIVE_RELOAD_HOST_ROOT")]
    host_root: Option<Utf8PathBuf>,

    /// Creator name; only plugins under `Custom/Scripts/<creator>` are watched.
    #[arg(long, global = true, env = "LIVE_RELOAD_CREATOR")]
    creator: Option<String>,

    /// Only watch plugins of this container.
    ///
    /// `Session` watches every container plus the session plugins.
    #[arg(long, global = true, env = "LIVE_RELOAD_CONTAINER_SCOPE")]
    container: Option<String>,

    /// Time between change checks in milliseconds (500 to 2000).
    #[arg(long, global = true, env = "LIVE_RELOAD_INTERVAL_MS")]
    interval_ms: Option<u64>,

    /// Command run for every reload.
    ///
    /// Runs in the host root with `LIVE_RELOAD_CONTAINER` and
    /// `LIVE_RELOAD_PLUGIN` set. Without it reloads are only logged.
    #[arg(long, global = true, env = "LIVE_RELOAD_RELOAD_CMD")]
    reload_cmd: Option<String>,

    /// Milliseconds a reload command may run before it is killed.
    #[arg(
        long,
        global = true,
        env = "LIVE_RELOAD_RELOAD_TIMEOUT_MS",
        default_value_t = 10_000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    reload_timeout_ms: u64,

    /// Log the changed files before each reload.
    #[arg(long, global = true)]
    log_changes: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Discover plugins once and list their watched files.
    Scan,

    /// Watch plugins and reload them on change until interrupted.
    Watch {
        /// Frame period in milliseconds.
        #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..))]
        frame_ms: u64,

        /// Print plugin events to stdout as JSON lines.
        #[arg(long)]
        json: bool,
    },
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},ignore=warn,globset=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Builds a [`Config`] from the config file and CLI overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded, the result does not
/// validate, or the host root is not a directory.
fn build_config(cli: &Cli) -> color_eyre::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };

    if let Some(root) = &cli.host_root {
        config.scan.host_root.clone_from(root);
    }
    if let Some(creator) = &cli.creator {
        config.session.creator_name.clone_from(creator);
    }
    if let Some(container) = &cli.container {
        config.session.container = Some(container.clone());
    }
    if let Some(interval) = cli.interval_ms {
        config.schedule.check_interval_ms = interval;
    }
    if cli.log_changes {
        config.reload.log_changes = true;
    }

    config.validate()?;
    validate_dir(&config.scan.host_root)?;

    Ok(config)
}

fn validate_dir(path: &Utf8Path) -> color_eyre::Result<()> {
    if !path.exists() {
        return Err(color_eyre::eyre::eyre!("Host root does not exist: {path}"));
    }
    if !path.is_dir() {
        return Err(color_eyre::eyre::eyre!("Host root is not a directory: {path}"));
    }
    Ok(())
}

/// Creates the engine for the session file named on the command line.
fn create_engine(cli: &Cli, config: &Config) -> color_eyre::Result<Engine<SessionFileHost, DiskFileSystem>> {
    let session = cli
        .session
        .clone()
        .unwrap_or_else(|| config.scan.host_root.join("session.json"));
    let host = SessionFileHost::new(session, config, cli.reload_cmd.as_deref())
        .with_reload_timeout(Duration::from_millis(cli.reload_timeout_ms));
    let fs = DiskFileSystem::new().with_follow_links(config.scan.follow_links);

    info!(session = %host.session_path(), host_root = %config.scan.host_root, "Loading session");
    Ok(Engine::new(config, host, fs)?)
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Runs one discovery and initial scan, then lists what would be watched.
///
/// # Errors
///
/// Returns an error if the engine cannot be created or stops.
fn run_scan(cli: &Cli, config: &Config) -> color_eyre::Result<()> {
    let mut engine = create_engine(cli, config)?;
    let report = engine.check_now()?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    writeln!(handle)?;
    writeln!(handle, "Watched plugins ({}):", engine.registry().len())?;
    for plugin in engine.registry().iter() {
        writeln!(handle)?;
        writeln!(handle, "{} [{}]", plugin.id().label(), plugin.state())?;
        writeln!(handle, "  plugin: {}", plugin.id().plugin_path)?;
        writeln!(handle, "  root:   {}", plugin.root())?;
        writeln!(handle, "  files:  {}", plugin.changes().len())?;
        for path in plugin.changes().snapshot().paths() {
            writeln!(handle, "    {}", plugin.changes().relative(path))?;
        }
    }

    if !report.is_quiet() {
        writeln!(handle)?;
        writeln!(handle, "Events ({}):", report.events.len())?;
        for event in &report.events {
            writeln!(handle, "  {event}")?;
        }
    }

    Ok(())
}

/// Ticks the engine until Ctrl-C, SIGTERM, or a fatal engine error.
///
/// # Errors
///
/// Returns an error if the engine cannot be created or stops.
async fn run_watch(cli: &Cli, config: &Config, frame: Duration, json: bool) -> color_eyre::Result<()> {
    let mut engine = create_engine(cli, config)?;
    engine.set_focused(true);
    info!(
        plugins = engine.registry().len(),
        frame = ?frame,
        "Watching, press Ctrl-C to stop"
    );

    // Handle SIGTERM for graceful shutdown on Unix
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            result = tick(&mut engine, frame, json) => result?,
            _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C, shutting down"),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            result = tick(&mut engine, frame, json) => result?,
            _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C, shutting down"),
        }
    }

    Ok(())
}

/// Feeds elapsed wall time into the engine once per frame.
async fn tick<H, F>(engine: &mut Engine<H, F>, frame: Duration, json: bool) -> color_eyre::Result<()>
where
    H: PluginHost,
    F: FileSystem,
{
    let mut interval = tokio::time::interval(frame);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = Instant::now();

    loop {
        let now = interval.tick().await;
        // Reload commands and disk reads block; keep the other workers free.
        let report = tokio::task::block_in_place(|| engine.advance(now.saturating_duration_since(last)))?;
        last = now;

        if json && !report.is_quiet() {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            for event in &report.events {
                writeln!(handle, "{}", serde_json::to_string(event)?)?;
            }
        }
    }
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Build and validate the configuration
    let config = build_config(&cli)?;

    // 5. Route to appropriate command
    match &cli.command {
        Commands::Scan => run_scan(&cli, &config),
        Commands::Watch { frame_ms, json } => {
            run_watch(&cli, &config, Duration::from_millis(*frame_ms), *json).await
        }
    }
}
