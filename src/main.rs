//! Headless bidwatch runner.
//!
//! Usage: `bidwatch <snapshot.json> [--config <path>] [--once]`
//!
//! Re-reads the snapshot file on every tick, logs native notifications via
//! the log backend, and prints each new alert as one JSON line. `--once`
//! runs a single pass and exits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use bidwatch::config::{default_config_path, load_config};
use bidwatch::{
    ChannelSink, EngineConfig, EngineError, EngineRunner, LogBackend, SinkEvent, Snapshot,
    SnapshotProvider,
};

/// Snapshot read from disk on every tick. A file that fails to read or
/// parse keeps the last good snapshot.
struct FileSnapshot {
    path: PathBuf,
    last: Mutex<Snapshot>,
}

impl FileSnapshot {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            last: Mutex::new(Snapshot::default()),
        }
    }

    fn read(path: &Path) -> Result<Snapshot, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
    }
}

impl SnapshotProvider for FileSnapshot {
    fn snapshot(&self) -> Snapshot {
        match Self::read(&self.path) {
            Ok(snapshot) => {
                *self.last.lock() = snapshot.clone();
                snapshot
            }
            Err(e) => {
                log::warn!("{}; keeping last snapshot", e);
                self.last.lock().clone()
            }
        }
    }
}

struct Args {
    snapshot: PathBuf,
    config: Option<PathBuf>,
    once: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut snapshot = None;
    let mut config = None;
    let mut once = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or("--config needs a path")?;
                config = Some(PathBuf::from(path));
            }
            "--once" => once = true,
            _ if snapshot.is_none() => snapshot = Some(PathBuf::from(&arg)),
            other => return Err(format!("Unexpected argument: {}", other)),
        }
    }

    Ok(Args {
        snapshot: snapshot.ok_or("usage: bidwatch <snapshot.json> [--config <path>] [--once]")?,
        config,
        once,
    })
}

fn resolve_config(explicit: Option<&Path>) -> Result<EngineConfig, EngineError> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match load_config(&default_config_path()?) {
        Err(EngineError::ConfigNotFound(path)) => {
            log::info!("No config at {}, using defaults", path.display());
            Ok(EngineConfig::default())
        }
        other => other,
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(args).await {
        log::error!("{}", e);
        eprintln!("{}", e.recovery_suggestion());
        // 75 is EX_TEMPFAIL: a supervisor may restart us.
        std::process::exit(if e.is_retryable() { 75 } else { 1 });
    }
}

async fn run(args: Args) -> Result<(), EngineError> {
    let config = resolve_config(args.config.as_deref())?;
    let (runner, feed) = EngineRunner::from_config(&config, Arc::new(LogBackend::new())).await?;

    let (sink, mut events) = ChannelSink::new();
    runner.add_sink(Arc::new(sink));

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let SinkEvent::Created(alert) = event {
                match serde_json::to_string(&alert) {
                    Ok(line) => println!("{}", line),
                    Err(e) => log::warn!("Failed to serialize alert {}: {}", alert.id, e),
                }
            }
        }
    });

    runner.start_with_provider(Arc::new(FileSnapshot::new(args.snapshot)));

    if !args.once {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Failed to listen for ctrl-c: {}", e);
        }
    }
    runner.stop();

    {
        let feed = feed.lock();
        log::info!(
            "Feed: {} visible, {} unread, {} urgent",
            feed.visible().len(),
            feed.unread_count(),
            feed.urgent_count()
        );
    }

    // The channel closes once the engine and its in-flight forwards are gone.
    drop(runner);
    if let Err(e) = printer.await {
        log::warn!("Alert printer ended abnormally: {}", e);
    }
    Ok(())
}
