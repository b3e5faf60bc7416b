use tally_consensus::{ExecutionEngine, Message};
use tokio::sync::mpsc::{Receiver, Sender};
use tracing::{debug, warn};

use crate::error::NodeError;

/// Decodes raw peer bytes onto the inbound queue. Bytes that do not decode
/// are dropped.
pub async fn run_ingest(
    engine: ExecutionEngine,
    mut ingress: Receiver<Vec<u8>>,
    inbound: Sender<Message>,
) -> Result<(), NodeError> {
    while let Some(bytes) = ingress.recv().await {
        let msg = match engine.decode(&bytes) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Dropping malformed message ({} bytes): {}", bytes.len(), e);
                continue;
            }
        };

        inbound
            .send(msg)
            .await
            .map_err(|_| NodeError::Runtime("inbound queue closed".into()))?;
    }

    debug!("Ingress closed, ingest worker exiting");
    Ok(())
}
