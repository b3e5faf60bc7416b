use tally_consensus::Message;
use tokio::sync::mpsc::Receiver;
use tracing::debug;

use crate::error::NodeError;
use crate::network::LoopbackPort;

/// Encodes everything on the network-out queue and fans it out to peers.
pub async fn run_outbound(
    mut network_out: Receiver<Message>,
    port: LoopbackPort,
) -> Result<(), NodeError> {
    while let Some(msg) = network_out.recv().await {
        let peers = port.broadcast(msg.marshal_binary()).await;
        debug!("{} sent {} to {} peers", port.id(), msg, peers);
    }

    debug!("Network-out queue closed, outbound worker exiting");
    Ok(())
}
