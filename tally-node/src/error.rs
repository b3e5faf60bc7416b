use std::io;

use tally_common::auth::AuthError;
use tally_consensus::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Key error: {0}")]
    Key(#[from] AuthError),

    /// Local state diverged from the network. The node must stop.
    #[error("Fatal: {0}")]
    Fatal(#[source] EngineError),

    #[error("Runtime error: {0}")]
    Runtime(String),
}
