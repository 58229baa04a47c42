// CLI - Command Line Interface for Ledger Guard
// Principle: Simple, clear, composable commands

pub mod config;
pub mod runner;

use crate::governance::ProposalTier;
use crate::invariants::InvariantLevel;
use crate::types::{BlockNumber, VotingPower};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ledger Guard - Governance parameters and runtime invariants
#[derive(Parser, Debug)]
#[command(name = "ledger-guard")]
#[command(author = "Ledger Guard Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Tiered governance parameters and runtime invariant checks for a ledger node")]
#[command(long_about = r#"
Ledger Guard validates and stores tiered governance parameters, decides
proposal tallies, and checks ledger snapshots against runtime invariants.

Initialize the parameter store with defaults:
  ledger-guard params init

Validate then commit a proposed parameter set:
  ledger-guard params validate proposal.json
  ledger-guard params apply proposal.json

Check a ledger snapshot, halting on the first violation:
  ledger-guard check snapshot.json --invariants fatal
"#)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true, default_value = "false")]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", env = "LEDGER_GUARD_LOG")]
    pub log_level: String,

    /// Base path for the parameter store
    #[arg(short = 'd', long, global = true, env = "LEDGER_GUARD_BASE_PATH")]
    pub base_path: Option<PathBuf>,

    /// JSON config file (base_path, invariant_level)
    #[arg(short, long, global = true, env = "LEDGER_GUARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Invariant level (ignore, log-only, fatal)
    #[arg(long = "invariants", global = true, value_name = "LEVEL")]
    pub invariant_level: Option<InvariantLevel>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Governance parameter management
    Params(ParamsCmd),

    /// Decide a tally with a tier's tallying procedure
    Tally(TallyCmd),

    /// Run the invariants over a ledger snapshot
    Check(CheckCmd),
}

/// Governance parameter commands
#[derive(Parser, Debug)]
pub struct ParamsCmd {
    #[command(subcommand)]
    pub subcommand: ParamsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ParamsSubcommand {
    /// Print the default parameter set as JSON
    Defaults,

    /// Validate a proposed parameter set without storing it
    Validate {
        /// Parameter set file (JSON)
        file: PathBuf,
    },

    /// Write the defaults into an empty store
    Init,

    /// Validate a proposed parameter set and commit it
    Apply {
        /// Parameter set file (JSON)
        file: PathBuf,
    },

    /// Print stored parameters
    Show {
        /// Only this tier (critical, important, normal)
        #[arg(long)]
        tier: Option<ProposalTier>,
    },
}

/// Tally inputs, in voting power units
#[derive(Parser, Debug)]
pub struct TallyCmd {
    /// Proposal tier (critical, important, normal)
    #[arg(long)]
    pub tier: ProposalTier,

    #[arg(long, default_value = "0")]
    pub yes: VotingPower,

    #[arg(long, default_value = "0")]
    pub no: VotingPower,

    #[arg(long, default_value = "0")]
    pub abstain: VotingPower,

    #[arg(long, default_value = "0")]
    pub no_with_veto: VotingPower,

    /// Total bonded voting power
    #[arg(long)]
    pub bonded: VotingPower,

    /// Use default parameters instead of the store
    #[arg(long)]
    pub defaults: bool,
}

/// Snapshot check
#[derive(Parser, Debug)]
pub struct CheckCmd {
    /// Ledger snapshot file (JSON)
    pub snapshot: PathBuf,

    /// Override the snapshot's block height
    #[arg(long)]
    pub height: Option<BlockNumber>,
}
