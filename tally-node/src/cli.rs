use clap::Parser;
use std::path::PathBuf;
use tally_common::Hash;

#[derive(Parser, Debug)]
#[command(name = "tally-node")]
#[command(about = "Minute-close consensus node")]
pub struct Args {
    /// Path to the JSON config. Created with defaults when missing.
    #[arg(long, value_name = "FILE", default_value = "config.json")]
    pub config: PathBuf,

    /// Overrides `keypair_path` from the config.
    #[arg(long, value_name = "FILE")]
    pub keypair: Option<PathBuf>,

    /// Hex identity chain id, overriding the config.
    #[arg(long, value_name = "HEX", value_parser = parse_identity)]
    pub identity: Option<Hash>,

    /// Stdout filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info,tally_node=debug")]
    pub log_filter: String,
}

fn parse_identity(s: &str) -> Result<Hash, String> {
    Hash::from_hex(s).map_err(|e| e.to_string())
}
