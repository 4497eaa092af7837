//! subnet-cli
//!
//! Operator CLI for subnets, blockchains and validators on the Dijets
//! platform chain.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use subnet_cli::{
    config::{default_config_path, LedgerConfig},
    telemetry::init_tracing,
    Config, Id,
};

mod commands;

#[derive(Parser)]
#[command(name = "subnet-cli")]
#[command(about = "Create subnets, blockchains and validators on the Dijets platform chain")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (default: ~/.subnet-cli/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Flags that take precedence over the config file.
#[derive(Args)]
struct Overrides {
    /// Node endpoint
    #[arg(long, global = true)]
    uri: Option<String>,

    /// Private key file
    #[arg(long, global = true)]
    private_key_path: Option<PathBuf>,

    /// Sign with a hardware device through the local bridge
    #[arg(long, global = true)]
    ledger: bool,

    /// Seconds between confirmation polls
    #[arg(long, global = true)]
    poll_interval: Option<u64>,

    /// Seconds to wait for confirmation before giving up
    #[arg(long, global = true)]
    poll_timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create keys, VM IDs, subnets and blockchains
    #[command(subcommand)]
    Create(CreateCommand),

    /// Add validators
    #[command(subcommand)]
    Add(AddCommand),

    /// Query status
    #[command(subcommand)]
    Status(StatusCommand),
}

#[derive(Subcommand)]
enum CreateCommand {
    /// Generate a private key file
    Key {
        /// Overwrite an existing key file
        #[arg(long)]
        force: bool,
    },

    /// Derive a VM ID from a VM name
    Vmid {
        /// VM name, at most 32 bytes
        name: String,
    },

    /// Create a subnet owned by the key
    Subnet {
        /// Compute the subnet ID without submitting
        #[arg(long)]
        dry_mode: bool,

        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Create a blockchain on a subnet
    Blockchain {
        /// Subnet to create the blockchain on
        #[arg(long)]
        subnet_id: Id,

        /// Blockchain name
        #[arg(long)]
        chain_name: String,

        /// VM the blockchain runs
        #[arg(long)]
        vm_id: Id,

        /// VM genesis file
        #[arg(long)]
        vm_genesis_path: PathBuf,

        /// Wait until the blockchain is validating and bootstrapped
        #[arg(long)]
        poll_status: bool,

        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum AddCommand {
    /// Add primary network validators
    Validator {
        /// Node IDs to add
        #[arg(long, required = true, value_delimiter = ',')]
        node_ids: Vec<String>,

        /// Stake in nDJTX (default: network minimum)
        #[arg(long)]
        stake_amount: Option<u64>,

        /// Validation start, unix seconds (default: 30s from now)
        #[arg(long)]
        validate_start: Option<u64>,

        /// Validation end, unix seconds (default: 60 days after start)
        #[arg(long)]
        validate_end: Option<u64>,

        /// Reward fee charged to delegators, in percent
        #[arg(long, default_value = "2")]
        reward_fee_percent: u32,

        /// Reward address (default: the key's address)
        #[arg(long)]
        reward_address: Option<String>,

        /// Change address (default: the key's address)
        #[arg(long)]
        change_address: Option<String>,

        /// Wait until the nodes show up as validators
        #[arg(long)]
        wait: bool,

        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Add subnet validators
    SubnetValidator {
        /// Subnet to validate
        #[arg(long)]
        subnet_id: Id,

        /// Node IDs to add
        #[arg(long, required = true, value_delimiter = ',')]
        node_ids: Vec<String>,

        /// Validator weight
        #[arg(long, default_value_t = commands::add_subnet_validator::DEFAULT_WEIGHT)]
        validate_weight: u64,

        /// Validation start, unix seconds (default: within the primary network window)
        #[arg(long)]
        validate_start: Option<u64>,

        /// Validation end, unix seconds (default: primary network end)
        #[arg(long)]
        validate_end: Option<u64>,

        /// Change address (default: the key's address)
        #[arg(long)]
        change_address: Option<String>,

        /// Wait until the nodes show up as subnet validators
        #[arg(long)]
        wait: bool,

        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum StatusCommand {
    /// Show a blockchain's status
    Blockchain {
        /// Blockchain to query
        blockchain_id: Id,

        /// Wait until the blockchain is validating
        #[arg(long)]
        wait: bool,
    },
}

/// Merge the config file with the command line.
fn load_config(path: Option<PathBuf>, overrides: Overrides) -> Result<Config> {
    let path = path.unwrap_or_else(default_config_path);
    let mut config = Config::load_or_default(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    if let Some(uri) = overrides.uri {
        config.uri = uri;
    }
    if let Some(path) = overrides.private_key_path {
        config.private_key_path = path;
    }
    if overrides.ledger && config.ledger.is_none() {
        config.ledger = Some(LedgerConfig::default());
    }
    if let Some(interval) = overrides.poll_interval {
        config.poll_interval = interval;
    }
    if let Some(timeout) = overrides.poll_timeout {
        config.poll_timeout = Some(timeout);
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let config = load_config(cli.config, cli.overrides)?;

    match cli.command {
        Commands::Create(CreateCommand::Key { force }) => {
            commands::create_key::run(&config.private_key_path, force)
        }
        Commands::Create(CreateCommand::Vmid { name }) => commands::create_vmid::run(&name),
        Commands::Create(CreateCommand::Subnet { dry_mode, yes }) => {
            commands::create_subnet::run(&config, dry_mode, yes).await
        }
        Commands::Create(CreateCommand::Blockchain {
            subnet_id,
            chain_name,
            vm_id,
            vm_genesis_path,
            poll_status,
            yes,
        }) => {
            commands::create_blockchain::run(
                &config,
                subnet_id,
                &chain_name,
                vm_id,
                &vm_genesis_path,
                poll_status,
                yes,
            )
            .await
        }
        Commands::Add(AddCommand::Validator {
            node_ids,
            stake_amount,
            validate_start,
            validate_end,
            reward_fee_percent,
            reward_address,
            change_address,
            wait,
            yes,
        }) => {
            let args = commands::add_validator::Args {
                node_ids,
                stake_amount,
                start: validate_start,
                end: validate_end,
                reward_fee_percent,
                reward_address,
                change_address,
                wait,
                yes,
            };
            commands::add_validator::run(&config, args).await
        }
        Commands::Add(AddCommand::SubnetValidator {
            subnet_id,
            node_ids,
            validate_weight,
            validate_start,
            validate_end,
            change_address,
            wait,
            yes,
        }) => {
            let args = commands::add_subnet_validator::Args {
                subnet_id,
                node_ids,
                weight: validate_weight,
                start: validate_start,
                end: validate_end,
                change_address,
                wait,
                yes,
            };
            commands::add_subnet_validator::run(&config, args).await
        }
        Commands::Status(StatusCommand::Blockchain {
            blockchain_id,
            wait,
        }) => commands::status::run(&config, blockchain_id, wait).await,
    }
}
