use anyhow::Result;
use clap::Parser;
use depsync::Cli;

fn main() -> Result<()> {
    Cli::parse().run()
}
