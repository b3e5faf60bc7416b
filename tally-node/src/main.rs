use std::path::PathBuf;

use clap::Parser;
use tally_node::{
    build_runtime,
    cli::Args,
    config::Config,
    key_manager::load_or_generate_signing_key,
    network::LoopbackNetwork,
    setup::ensure_config,
};
use tracing::{error, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    ensure_config(&args.config)?;
    let mut config = Config::load_from_file(&args.config)?;
    if let Some(identity) = args.identity {
        config.identity_chain_id = Some(identity);
    }

    // Consensus events go to their own audit file; everything else to stdout.
    std::fs::create_dir_all(&config.log_dir)?;
    let file_appender = tracing_appender::rolling::never(
        &config.log_dir,
        format!("consensus-{}.log", config.node_id),
    );
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let consensus_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target() == "consensus"
        }));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_filter.clone().into()),
        )
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target() != "consensus"
        }));

    tracing_subscriber::registry()
        .with(consensus_layer)
        .with(stdout_layer)
        .init();

    info!("Config: {}", args.config.display());

    let keypair_path = args
        .keypair
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.keypair_path));
    let signing_key = load_or_generate_signing_key(&keypair_path)?;

    let network = LoopbackNetwork::new();
    let mut runtime = build_runtime(&config, signing_key, &network)?;

    tokio::select! {
        result = runtime.wait() => {
            if let Err(e) = result {
                error!("Node {} stopped: {}", runtime.node_id, e);
                return Err(e.into());
            }
            info!("All workers exited");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down {}", runtime.node_id);
            runtime.shutdown();
        }
    }

    Ok(())
}
