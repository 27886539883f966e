//! Command-line interface for inowatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// inowatch - print inotify events for files and directory trees
#[derive(Debug, Parser)]
#[command(name = "inowatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "INOWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, env = "INOWATCH_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Watch paths and print one line per event
    Watch {
        /// Paths to watch (defaults to the [[watch]] entries of the config file)
        paths: Vec<PathBuf>,

        /// Event to watch for, repeatable (e.g. create, delete, all_events)
        #[arg(short, long = "event", value_name = "EVENT")]
        events: Vec<String>,

        /// Watch directories recursively
        #[arg(short, long)]
        recursive: bool,

        /// Exit after this many events
        #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
        count: Option<u64>,
    },

    /// List the recognized event symbols and their mask bits
    Flags,

    /// Show the kernel's per-user inotify limits
    Limits,
}
