use std::{fs, io, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use tally_common::{auth::Authenticator, Hash, NetworkProfile};

use crate::error::NodeError;

pub const DEFAULT_QUEUE_CAPACITY: usize = 64;
pub const DEFAULT_MINUTE_DURATION_MS: u64 = 6_000;

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_minute_duration_ms() -> u64 {
    DEFAULT_MINUTE_DURATION_MS
}

fn default_bind_identity() -> bool {
    true
}

fn default_log_dir() -> String {
    "logs".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub node_id: String,
    pub network: NetworkProfile,
    pub server_mode: bool,
    /// Falls back to the SHA-256 of the node's public key.
    #[serde(default)]
    pub identity_chain_id: Option<Hash>,
    pub keypair_path: String,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_minute_duration_ms")]
    pub minute_duration_ms: u64,
    /// Run the leader minute ticker on this node.
    #[serde(default)]
    pub produce_minutes: bool,
    /// Reject signatures whose key does not hash to the identity they name.
    #[serde(default = "default_bind_identity")]
    pub bind_identity: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_id: "node-local".to_string(),
            network: NetworkProfile::Local,
            server_mode: false,
            identity_chain_id: None,
            keypair_path: "keys/node.key".to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            minute_duration_ms: DEFAULT_MINUTE_DURATION_MS,
            produce_minutes: false,
            bind_identity: true,
            log_dir: default_log_dir(),
        }
    }
}

impl Config {
    /// Rejects values the runtime cannot start with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.queue_capacity == 0 {
            return Err(NodeError::Config("queue_capacity must be at least 1".into()));
        }
        if self.minute_duration_ms == 0 {
            return Err(NodeError::Config(
                "minute_duration_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn minute_duration(&self) -> Duration {
        Duration::from_millis(self.minute_duration_ms)
    }

    pub fn identity_for(&self, auth: &dyn Authenticator) -> Hash {
        self.identity_chain_id
            .unwrap_or_else(|| Hash::sha(&auth.public_key()))
    }

    /// Resolves this node's identity, refusing one its own signatures could
    /// not be bound to.
    pub fn checked_identity(&self, auth: &dyn Authenticator) -> Result<Hash, NodeError> {
        let identity = self.identity_for(auth);
        if self.bind_identity && identity != Hash::sha(&auth.public_key()) {
            return Err(NodeError::Config(format!(
                "identity_chain_id {} is not derived from the node key; \
                 set bind_identity to false to use it",
                identity
            )));
        }
        Ok(identity)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        fs::write(path, json)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let data = fs::read_to_string(path)?;
        serde_json::from_str::<Config>(&data)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}
