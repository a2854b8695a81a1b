use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::{path::PathBuf, sync::Arc};
use vela_common::{
    config::{ChainConfig, DEFAULT_CHAIN_ID, DEFAULT_EVM_CHAIN_ID},
    get_cli_styles,
};
use vela_daemon::{
    config::NodeConfig, consensus::LocalConsensus, core::handler::EvmHandler, Node,
};
use vela_genesis::{
    modules::{StakingGenesis, STAKING_MODULE},
    GenesisBuilder, GenesisState, ValidatorIdentity,
};

/// Vela single validator node
#[derive(Parser)]
#[command(name = "vela_daemon")]
#[command(version = vela_common::config::VERSION, styles = get_cli_styles())]
struct Cli {
    #[clap(flatten)]
    node: NodeConfig,

    /// Chain identifier
    #[arg(long, default_value = DEFAULT_CHAIN_ID)]
    chain_id: String,

    /// Genesis document produced by vela_genesis, a fresh one is built if not set
    #[arg(long)]
    genesis: Option<PathBuf>,

    /// Seed of the validator key, must match the one given to vela_genesis
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let evm_chain_id =
        ChainConfig::parse_evm_chain_id(&cli.chain_id).unwrap_or(DEFAULT_EVM_CHAIN_ID);
    let chain = ChainConfig::new(cli.chain_id.clone(), evm_chain_id);

    let identity = match cli.seed {
        Some(seed) => ValidatorIdentity::seeded(seed, 0),
        None => ValidatorIdentity::random("node0"),
    };

    let genesis = match &cli.genesis {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Error while reading genesis {}", path.display()))?;
            check_validator_listed(&bytes, &identity)?;
            bytes
        }
        None => {
            let output = GenesisBuilder::new(chain.clone())
                .with_validator(identity.clone())
                .build()
                .context("Error while building genesis")?;
            info!("Primary account: {}", output.primary.address());
            output.state.to_json_bytes()?
        }
    };

    let consensus = Arc::new(LocalConsensus::new(vec![identity.consensus_address()])?);
    let node = Node::new(
        cli.node.with_chain(chain),
        identity,
        consensus,
        Arc::new(EvmHandler::new()),
    );
    let app_hash = node.init_with_genesis(&cli.chain_id, &genesis)?;
    info!("Genesis app hash: {}", app_hash);

    node.start().await?;
    if let Some(endpoint) = node.rpc_endpoint() {
        info!("JSON-RPC available at {}", endpoint);
    }

    tokio::signal::ctrl_c()
        .await
        .context("Error while waiting for Ctrl-C")?;
    info!("Received Ctrl-C, shutting down...");
    node.shutdown().await;

    Ok(())
}

// A genesis without our validator would never produce a block
fn check_validator_listed(bytes: &[u8], identity: &ValidatorIdentity) -> Result<()> {
    let state = GenesisState::from_json_bytes(bytes)?;
    let staking: StakingGenesis = state.module(STAKING_MODULE)?;
    let listed = staking
        .validators
        .iter()
        .any(|validator| validator.consensus_address == identity.consensus_address());
    if !listed {
        warn!(
            "Validator {} is not part of the genesis validator set",
            identity.consensus_address()
        );
    }
    Ok(())
}
