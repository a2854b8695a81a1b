//! Vela genesis generator
//!
//! Builds a genesis document for a local test network and writes it as JSON.
//!
//! ```bash
//! vela_genesis --validators 4 --output genesis.json
//! ```
//!
//! Secret keys are never printed. Use `--seed` to get reproducible keys.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::{fs, io::Write, path::PathBuf};
use vela_common::{
    config::{ChainConfig, DEFAULT_CHAIN_ID, DEFAULT_DENOM, DEFAULT_EVM_CHAIN_ID},
    get_cli_styles,
};
use vela_genesis::{
    GenesisBuilder, TestIdentity, DEFAULT_FUNDING, DEFAULT_STAKE_PER_VALIDATOR,
};

#[derive(Parser)]
#[command(name = "vela_genesis")]
#[command(about = "Vela genesis generator")]
#[command(version = vela_common::config::VERSION, styles = get_cli_styles())]
struct Cli {
    /// Number of validators to generate
    #[arg(long, default_value_t = 1)]
    validators: usize,

    /// Chain identifier
    #[arg(long, default_value = DEFAULT_CHAIN_ID)]
    chain_id: String,

    /// EVM chain id used when signing transactions
    #[arg(long)]
    evm_chain_id: Option<u64>,

    /// Base denomination
    #[arg(long, default_value = DEFAULT_DENOM)]
    denom: String,

    /// Funding of the primary account, validator stakes included
    #[arg(long, default_value_t = DEFAULT_FUNDING)]
    primary_funding: u128,

    /// Funding of the fee collector module account
    #[arg(long, default_value_t = DEFAULT_FUNDING)]
    fee_collector_funding: u128,

    /// Bonded tokens per validator
    #[arg(long, default_value_t = DEFAULT_STAKE_PER_VALIDATOR)]
    stake: u128,

    /// Seed for deterministic keys
    #[arg(long)]
    seed: Option<u64>,

    /// Output file, stdout if not set
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let evm_chain_id = match cli.evm_chain_id {
        Some(id) => id,
        None => ChainConfig::parse_evm_chain_id(&cli.chain_id).unwrap_or(DEFAULT_EVM_CHAIN_ID),
    };
    let chain = ChainConfig::new(cli.chain_id, evm_chain_id);

    let mut builder = GenesisBuilder::new(chain)
        .with_denom(cli.denom)
        .with_primary_funding(cli.primary_funding)
        .with_fee_collector_funding(cli.fee_collector_funding)
        .with_stake_per_validator(cli.stake);
    builder = match cli.seed {
        Some(seed) => builder
            .with_primary(TestIdentity::from_seed(seed))
            .with_seeded_validators(cli.validators, seed),
        None => builder.with_generated_validators(cli.validators),
    };

    let output = builder.build().context("Error while building genesis")?;

    info!("Primary account: {}", output.primary.address());
    for validator in &output.validators {
        info!(
            "{}: operator {} consensus {}",
            validator.moniker(),
            validator.operator_address(),
            validator.consensus_address()
        );
    }

    let json = output
        .state
        .to_json_bytes()
        .context("Error while serializing genesis")?;
    match cli.output {
        Some(path) => {
            fs::write(&path, &json)
                .with_context(|| format!("Error while writing genesis to {}", path.display()))?;
            info!("Genesis written to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&json)?;
            stdout.write_all(b"\n")?;
        }
    }

    Ok(())
}
