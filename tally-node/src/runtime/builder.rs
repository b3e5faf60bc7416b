use std::sync::Arc;

use tally_common::{
    auth::{ed25519::Ed25519Authenticator, Authenticator},
    Hash,
};
use tally_consensus::{ExecutionEngine, NodeState};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::info;

use crate::config::Config;
use crate::error::NodeError;
use crate::network::LoopbackNetwork;
use crate::runtime::{
    follower::run_follower, ingest::run_ingest, leader::run_leader, outbound::run_outbound,
};
use crate::state::{LocalState, StateQueues};

pub type Result<T> = std::result::Result<T, NodeError>;

pub struct NodeRuntime {
    pub node_id: String,
    /// Raw inbound bytes, as a transport would deliver them.
    pub ingress: mpsc::Sender<Vec<u8>>,
    pub state: Arc<LocalState>,
    pub engine: ExecutionEngine,
    tasks: JoinSet<Result<()>>,
}

impl NodeRuntime {
    /// Resolves with the first worker error, or `Ok` once every worker has
    /// exited cleanly.
    pub async fn wait(&mut self) -> Result<()> {
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => {
                    self.tasks.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    self.tasks.abort_all();
                    return Err(NodeError::Runtime(format!("worker task failed: {e}")));
                }
            }
        }
        Ok(())
    }

    pub fn shutdown(&mut self) {
        self.tasks.abort_all();
    }
}

/// Wires a node's state, engine and workers together and attaches it to
/// `network`.
pub fn build_runtime(
    config: &Config,
    signing_key: Ed25519Authenticator,
    network: &LoopbackNetwork,
) -> Result<NodeRuntime> {
    config.validate()?;

    let capacity = config.queue_capacity;
    let (ingress_tx, ingress_rx) = mpsc::channel::<Vec<u8>>(capacity);
    let (in_tx, in_rx) = mpsc::channel(capacity);
    let (out_tx, out_rx) = mpsc::channel(capacity);
    let (leader_tx, leader_rx) = mpsc::channel(capacity);

    let identity = config.checked_identity(&signing_key)?;
    let public_key = signing_key.public_key();

    let state = Arc::new(LocalState::new(
        config.network.number(),
        config.server_mode,
        config.bind_identity,
        identity,
        Box::new(signing_key),
        StateQueues {
            network_out: out_tx,
            inbound: in_tx.clone(),
            leader_in: leader_tx,
        },
    ));
    let facade: Arc<dyn NodeState> = state.clone();
    let engine = ExecutionEngine::new(facade);

    let port = network.join(&config.node_id, ingress_tx.clone());

    let mut tasks = JoinSet::new();
    tasks.spawn(run_ingest(engine.clone(), ingress_rx, in_tx));
    tasks.spawn(run_follower(engine.clone(), Arc::clone(&state), in_rx));
    tasks.spawn(run_leader(
        engine.clone(),
        leader_rx,
        config.produce_minutes,
        config.minute_duration(),
    ));
    tasks.spawn(run_outbound(out_rx, port));

    info!(
        "Node {} started: network={} server={} producer={} identity={} key={}",
        config.node_id,
        config.network,
        config.server_mode,
        config.produce_minutes,
        identity,
        Hash::sha(&public_key),
    );

    Ok(NodeRuntime {
        node_id: config.node_id.clone(),
        ingress: ingress_tx,
        state,
        engine,
        tasks,
    })
}
