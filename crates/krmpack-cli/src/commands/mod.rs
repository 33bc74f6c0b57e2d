//! CLI commands and argument parsing.

pub mod run;

use clap::{Parser, Subcommand};

/// krmpack - Pulls or Pushes OCI Native KRM Packages
#[derive(Parser)]
#[command(name = "krmpack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run the package pipeline over a directory of resources
    Run(run::RunArgs),

    /// Print version information
    Version,
}
