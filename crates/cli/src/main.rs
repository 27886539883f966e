//! inowatch
//!
//! Watches files and directory trees with inotify and prints one line per
//! event on stdout.

mod cli;
mod config;
mod output;

use clap::Parser;
use cli::{Cli, Command};
use color_eyre::eyre::{Result, bail};
use config::{Config, Target};
use inotifier::{InitFlags, Notifier};
use inotifier_watch::{Dispatcher, StopHandle, WatchError, WatchEvent};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::unix::AsyncFd;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref())?.with_log_level(cli.log_level.clone());

    init_logging(&config.general.log_level)?;

    match cli.command {
        Command::Watch {
            paths,
            events,
            recursive,
            count,
        } => {
            let targets = config.targets(&paths, &events, recursive);
            if targets.is_empty() {
                bail!("Nothing to watch: pass a path or add a [[watch]] entry to the config");
            }
            cmd_watch(targets, count).await
        }
        Command::Flags => cmd_flags(),
        Command::Limits => cmd_limits(),
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    // stdout carries the event lines
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

async fn cmd_watch(targets: Vec<Target>, count: Option<u64>) -> Result<()> {
    let notifier = Notifier::with_flags(InitFlags::NONBLOCK | InitFlags::CLOEXEC)?;
    let mut dispatcher = Dispatcher::with_notifier(notifier);
    let stop = dispatcher.stop_handle();
    let printed = Arc::new(AtomicU64::new(0));

    for target in &targets {
        let callback = printer(Arc::clone(&printed), count, stop.clone());
        if target.recursive {
            let wds = dispatcher.rwatch(&target.path, &target.events, callback)?;
            tracing::info!(path = %target.path.display(), watches = wds.len(), "Watching tree");
        } else {
            let wd = dispatcher.watch(&target.path, &target.events, callback)?;
            tracing::info!(path = %target.path.display(), wd, "Watching");
        }
    }

    let mut dispatcher = AsyncFd::new(dispatcher)?;

    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    while !stop.is_stopped() {
        tokio::select! {
            guard = dispatcher.readable_mut() => {
                let mut guard = guard?;
                drain(guard.get_inner_mut(), &stop)?;
                guard.clear_ready();
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
                break;
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT");
                break;
            }
        }
    }

    let mut dispatcher = dispatcher.into_inner();
    let overflows = dispatcher.overflows();
    dispatcher.close()?;

    tracing::info!(events = printed.load(Ordering::Relaxed), overflows, "Stopped");
    Ok(())
}

/// Process batches until the notifier has nothing queued.
fn drain(dispatcher: &mut Dispatcher, stop: &StopHandle) -> Result<(), WatchError> {
    while !stop.is_stopped() {
        match dispatcher.process() {
            Ok(_) => {}
            Err(err) if err.is_would_block() => return Ok(()),
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// Callback printing each event, stopping after `limit` events.
fn printer(
    printed: Arc<AtomicU64>,
    limit: Option<u64>,
    stop: StopHandle,
) -> impl FnMut(&WatchEvent) -> Result<(), WatchError> + Send + 'static {
    move |ev: &WatchEvent| -> Result<(), WatchError> {
        if stop.is_stopped() {
            return Ok(());
        }

        writeln!(std::io::stdout().lock(), "{}", output::format_event(ev))?;

        let n = printed.fetch_add(1, Ordering::Relaxed) + 1;
        if limit.is_some_and(|limit| n >= limit) {
            stop.stop();
        }
        Ok(())
    }
}

fn cmd_flags() -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    for line in output::flag_table() {
        writeln!(stdout, "{line}")?;
    }
    Ok(())
}

fn cmd_limits() -> Result<()> {
    println!("max_user_watches   {}", inotifier_watch::max_user_watches()?);
    println!("max_user_instances {}", inotifier_watch::max_user_instances()?);
    println!("max_queued_events  {}", inotifier_watch::max_queued_events()?);
    Ok(())
}
