//! In-process peer fan-out.
//!
//! Every node registers its ingress channel under its node id; a broadcast
//! hands a copy of the encoded bytes to every other registered node.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::Sender;
use tracing::{debug, warn};

type Peers = HashMap<String, Sender<Vec<u8>>>;

#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    peers: Arc<Mutex<Peers>>,
}

/// A node's attachment to a [`LoopbackNetwork`].
#[derive(Clone)]
pub struct LoopbackPort {
    id: String,
    network: LoopbackNetwork,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn peers(&self) -> MutexGuard<'_, Peers> {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `ingress` as the inbound byte channel of node `id`.
    pub fn join(&self, id: &str, ingress: Sender<Vec<u8>>) -> LoopbackPort {
        self.peers().insert(id.to_string(), ingress);
        LoopbackPort {
            id: id.to_string(),
            network: self.clone(),
        }
    }

    pub fn leave(&self, id: &str) {
        self.peers().remove(id);
    }

    pub fn node_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.peers().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl LoopbackPort {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Sends `bytes` to every node except this one. Returns how many peers
    /// accepted the copy.
    pub async fn broadcast(&self, bytes: Vec<u8>) -> usize {
        let targets: Vec<(String, Sender<Vec<u8>>)> = self
            .network
            .peers()
            .iter()
            .filter(|(id, _)| **id != self.id)
            .map(|(id, tx)| (id.clone(), tx.clone()))
            .collect();

        let mut delivered = 0;
        for (peer, tx) in targets {
            match tx.send(bytes.clone()).await {
                Ok(()) => delivered += 1,
                Err(_) => warn!("Peer {} ingress closed, dropping message", peer),
            }
        }
        debug!("{} broadcast {} bytes to {} peers", self.id, bytes.len(), delivered);
        delivered
    }
}
