//! # depsync
//!
//! Keeps a tree of git checkouts in line with a Puppetfile-style manifest.
//!
//! A run loads a manifest into a [`Registry`](registry::Registry), classifying
//! every declared module's working tree and discovering undeclared
//! repositories next to them. From there:
//!
//! - [`sync::SyncDriver`] checks out clean modules in parallel and skips
//!   dirty ones, reporting each skip as a [`sync::SyncIssue`];
//! - [`manifest::render`] writes the declared modules back out, pinned to the
//!   commits currently checked out;
//! - [`changelog::ChangelogReporter`] reports module history between releases.
//!
//! ```bash
//! depsync checkout            # Puppetfile.tracking
//! depsync status
//! depsync record stable tracking
//! depsync changelog2 5.1.0
//! ```

pub mod changelog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod git;
pub mod manifest;
pub mod parallel;
pub mod registry;
pub mod shared;
pub mod sync;
pub mod vcs;

pub use cli::Cli;
pub use error::{Error, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
