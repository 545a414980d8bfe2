//! Command-line interface for depsync
//!
//! Parses arguments with clap, sets up logging, and prints the results of
//! the [`commands`](crate::commands) layer.

mod output;

pub use output::Output;

use crate::commands::{self, DEFAULT_METHOD, DEFAULT_RECORD_METHOD, Workspace};
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "depsync",
    version = env!("CARGO_PKG_VERSION"),
    about = "Reconcile a Puppetfile-style manifest with the git checkouts on disk",
    long_about = "depsync checks out every module a manifest declares, reports local changes, \
                  records the checked-out commits into a pinned manifest, and prints changelogs \
                  between releases."
)]
pub struct Cli {
    /// Run as if started in <DIR> instead of current working directory
    #[arg(short = 'C', long = "directory", global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use custom configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text, global = true)]
    pub format: Format,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check out every module declared in <prefix>.<METHOD>
    Checkout {
        #[arg(default_value = DEFAULT_METHOD)]
        method: String,
    },
    /// Report modules with local changes and undeclared repositories
    Status {
        #[arg(default_value = DEFAULT_METHOD)]
        method: String,
    },
    /// Pin the modules of <REFERENCE> to their current commits in <METHOD>
    Record {
        #[arg(default_value = DEFAULT_RECORD_METHOD)]
        method: String,
        #[arg(default_value = DEFAULT_METHOD)]
        reference: String,
    },
    /// Show all commits since the date of a project commit
    Changelog {
        /// Project commit, branch or tag marking the starting point
        reference: String,
        #[arg(long, default_value = DEFAULT_METHOD)]
        source: String,
    },
    /// Compare modules against the manifest of a previous release
    Changelog2 {
        /// Project branch or tag of the previous release
        old_version: String,
        #[arg(long, default_value = DEFAULT_METHOD)]
        source: String,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        setup_logging(self.verbose, self.quiet);

        let basedir = self.directory.clone().unwrap_or_else(|| PathBuf::from("."));
        let workspace = Workspace::open(&basedir, self.config.as_deref())?;
        let verbose = self.verbose > 0 || workspace.config().general.verbose;
        let output = Output::new(verbose, self.quiet);

        match &self.command {
            Commands::Checkout { method } => {
                let bar = output.progress_bar(0, "Module checkout");
                let issues = commands::checkout_with_progress(
                    &workspace,
                    method,
                    Some(|done: usize, total: usize, _worker: usize| {
                        bar.set_length(total as u64);
                        bar.set_position(done as u64);
                    }),
                )?;
                bar.finish_and_clear();

                match self.format {
                    Format::Json => print_json(&issues)?,
                    Format::Text => output.checkout_issues(&issues),
                }
            }
            Commands::Status { method } => {
                let report = commands::status(&workspace, method)?;
                match self.format {
                    Format::Json => print_json(&report)?,
                    Format::Text => output.status(&report),
                }
            }
            Commands::Record { method, reference } => {
                let path = commands::record(&workspace, method, reference)?;
                match self.format {
                    Format::Json => print_json(&path)?,
                    Format::Text => output.success(&format!("Recorded {}", path.display())),
                }
            }
            Commands::Changelog { reference, source } => {
                let report = commands::changelog(&workspace, source, reference)?;
                match self.format {
                    Format::Json => print_json(&report)?,
                    Format::Text => output.since(&report),
                }
            }
            Commands::Changelog2 { old_version, source } => {
                let reports = commands::changelog2(&workspace, source, old_version)?;
                match self.format {
                    Format::Json => print_json(&reports)?,
                    Format::Text => output.comparison(&reports),
                }
            }
        }

        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => tracing_subscriber::EnvFilter::new("warn"),
        1 => tracing_subscriber::EnvFilter::new("info,globset=warn"),
        2 => tracing_subscriber::EnvFilter::new("debug,globset=warn"),
        _ => tracing_subscriber::EnvFilter::new("trace"),
    });

    // Another subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
