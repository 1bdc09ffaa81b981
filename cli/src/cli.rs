use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use simple_counter::ContractVersion;

/// Compiled contract releases.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Artifact {
    /// Increase only.
    SimpleContract,
    /// Increase and decrease.
    SimpleContractV2,
    /// Owner-gated decrease.
    SimpleContractV3,
}

impl Artifact {
    pub fn version(self) -> ContractVersion {
        match self {
            Self::SimpleContract => ContractVersion::V1,
            Self::SimpleContractV2 => ContractVersion::V2,
            Self::SimpleContractV3 => ContractVersion::V3,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "simple-counter")]
#[command(bin_name = "simple-counter")]
#[command(about = "Deploy, increment and upgrade SimpleContract on a local ledger")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Args)]
pub struct GlobalOptions {
    /// Config file (defaults to ./simple-counter.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Ledger snapshot file.
    #[arg(long, global = true)]
    pub ledger: Option<PathBuf>,

    /// Treasury that signs and pays for messages.
    #[arg(long, global = true)]
    pub sender: Option<String>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Deploy a new contract instance.
    Deploy(DeployArgs),
    /// Increase the counter and wait for the change.
    Increment(CounterArgs),
    /// Decrease the counter and wait for the change.
    Decrement(CounterArgs),
    /// Replace the contract code, optionally with new data.
    Upgrade(UpgradeArgs),
    /// Show counter, id and installed code.
    Get(GetArgs),
    /// Print a message body as BoC hex without sending it.
    Encode(EncodeArgs),
    /// Generate shell completion scripts.
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Instance id (random in 0..10000 when omitted).
    #[arg(long)]
    pub id: Option<u32>,

    /// Initial counter value.
    #[arg(long, default_value_t = 0)]
    pub counter: u32,

    /// Release to deploy.
    #[arg(long, value_enum, default_value_t = Artifact::SimpleContract)]
    pub artifact: Artifact,

    /// Value attached to the message, in coins.
    #[arg(long)]
    pub value: Option<String>,
}

#[derive(Debug, Args)]
pub struct CounterArgs {
    /// Contract address (raw or user-friendly).
    pub address: String,

    /// Amount to add or subtract.
    pub amount: u32,

    /// Correlation id carried in the message.
    #[arg(long)]
    pub query_id: Option<u64>,

    /// Value attached to the message, in coins.
    #[arg(long)]
    pub value: Option<String>,

    /// Return right after sending.
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(Debug, Args)]
pub struct UpgradeArgs {
    /// Contract address (raw or user-friendly).
    pub address: String,

    /// Release to install.
    #[arg(long, value_enum, default_value_t = Artifact::SimpleContractV2)]
    pub artifact: Artifact,

    /// Replace the data cell as well as the code.
    #[arg(long)]
    pub all: bool,

    /// Id written with `--all` (defaults to the current id).
    #[arg(long, requires = "all")]
    pub id: Option<u32>,

    /// Counter written with `--all` (defaults to the current counter).
    #[arg(long, requires = "all")]
    pub counter: Option<u32>,

    /// Owner written with `--all` for releases with an ownership gate;
    /// an address or a treasury name (defaults to the sender).
    #[arg(long, requires = "all")]
    pub owner: Option<String>,

    /// Install the code even if it cannot read the current data cell.
    #[arg(long, conflicts_with = "all")]
    pub force: bool,

    /// Decrease the counter by this much once the upgrade landed.
    #[arg(long)]
    pub decrease_by: Option<u32>,

    /// Value attached to each message, in coins.
    #[arg(long)]
    pub value: Option<String>,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Contract address (raw or user-friendly).
    pub address: String,

    /// Print JSON instead of plain lines.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct EncodeArgs {
    #[command(subcommand)]
    pub operation: EncodeOperation,

    /// Correlation id.
    #[arg(long, global = true, default_value_t = 0)]
    pub query_id: u64,
}

#[derive(Debug, Subcommand)]
pub enum EncodeOperation {
    /// Empty deploy body.
    Deploy,
    /// `increase` body.
    Increase {
        /// Amount to add.
        amount: u32,
    },
    /// `decrease` body.
    Decrease {
        /// Amount to subtract.
        amount: u32,
    },
    /// Code-only upgrade body.
    Upgrade {
        /// Release to install.
        #[arg(long, value_enum)]
        artifact: Artifact,
    },
    /// Code and data upgrade body.
    UpgradeAll {
        /// Release to install.
        #[arg(long, value_enum)]
        artifact: Artifact,
        /// Id in the new data cell.
        #[arg(long, default_value_t = 0)]
        id: u32,
        /// Counter in the new data cell.
        #[arg(long, default_value_t = 0)]
        counter: u32,
        /// Owner address in the new data cell.
        #[arg(long)]
        owner: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for.
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script to this file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}
