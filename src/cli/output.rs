//! Terminal output for depsync
//!
//! Styled messages, the checkout progress bar, and the text renderings of
//! command results.

use crate::changelog::{self, ModuleReport, SinceReport};
use crate::commands::StatusReport;
use crate::sync::SyncIssue;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output handler for consistent CLI formatting
pub struct Output {
    verbose: bool,
    quiet: bool,
}

impl Output {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("✔").green(), message);
        }
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            eprintln!("{} {}", style("⚠").yellow(), message);
        }
    }

    /// Progress bar for `len` modules; hidden in quiet mode.
    pub fn progress_bar(&self, len: u64, message: &str) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len);
        if let Ok(bar_style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(bar_style.progress_chars("#>-"));
        }
        pb.set_message(message.to_string());
        pb
    }

    /// Skipped modules: a summary by default, the full list when verbose.
    pub fn checkout_issues(&self, issues: &[SyncIssue]) {
        if issues.is_empty() {
            self.success("All modules are in sync");
            return;
        }

        let rule = "=".repeat(80);
        eprintln!("{rule}");
        if self.verbose {
            eprintln!("{}", style("Checkout Issues:").bold());
            for issue in issues {
                eprintln!("  * {issue}");
            }
        } else {
            eprintln!("{}", style("Warning: Some repositories were skipped!").yellow().bold());
            eprintln!("  * If this is a fresh build, this could be an issue");
            eprintln!("  * This is expected if re-running a build");
            eprintln!("  * Run with -v for full details");
        }
        eprintln!("{rule}");
    }

    pub fn status(&self, report: &StatusReport) {
        for warning in &report.warnings {
            self.warning(warning);
        }

        if report.has_changes() {
            println!("The following repositories have changes:");
            for module in &report.changed {
                println!("  {} {} => {}", style("+").yellow(), module.name, module.path.display());
            }
        } else {
            println!("No repositories have changes.");
        }

        if !report.unknown.is_empty() {
            println!("The following modules were unknown:");
            for name in &report.unknown {
                println!("  {} {}", style("?").cyan(), name);
            }
        }
    }

    pub fn comparison(&self, reports: &[ModuleReport]) {
        print!("{}", changelog::render_comparison(reports));
    }

    pub fn since(&self, report: &SinceReport) {
        print!("{}", changelog::render_since(report));
    }
}
