use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "scorebook",
    about = "Scorebook - league standings and player statistics from match scorecards",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding the match, statistics, and ledger documents
    #[arg(long, global = true, default_value = "scorebook-data")]
    pub data: PathBuf,

    /// TOML configuration file (defaults to <data>/scorebook.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Insert or replace match documents from a JSON file
    Import(ImportArgs),
    /// Bring standings and player statistics up to date
    Reconcile(ReconcileArgs),
    /// Show the league table
    Standings,
    /// Show player statistic lines
    Players(PlayersArgs),
    /// Compare the processed-match ledger with the match documents
    Audit,
}

#[derive(Args)]
pub struct ImportArgs {
    /// A JSON match document or an array of them
    pub file: PathBuf,
}

#[derive(Args)]
pub struct ReconcileArgs {
    /// Clear and rebuild every derived table
    #[arg(long)]
    pub full: bool,
}

#[derive(Args)]
pub struct PlayersArgs {
    #[arg(long)]
    pub team: Option<String>,
    #[arg(long)]
    pub season: Option<String>,
}
