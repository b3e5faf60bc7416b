use std::sync::Arc;

use tally_consensus::{
    ConsensusMessage, Disposition, EngineError, ExecutionEngine, Message, Validity,
};
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, info, warn};

use crate::error::NodeError;
use crate::state::LocalState;

/// Consumes the inbound queue.
///
/// EOMs are executed on arrival, which replays the active process list
/// slot, and the slot is then sealed into the current block. Every other
/// message is validated and queued in the process list for the next EOM
/// to replay.
pub async fn run_follower(
    engine: ExecutionEngine,
    state: Arc<LocalState>,
    mut inbound: Receiver<Message>,
) -> Result<(), NodeError> {
    while let Some(msg) = inbound.recv().await {
        if !state.observe(&msg) {
            debug!("Ignoring repeat delivery of {}", msg);
            continue;
        }

        match msg {
            Message::Eom(_) => match engine.execute(&msg).await {
                Ok(Disposition::Executed { .. }) => {
                    let sealed = state.seal_minute();
                    debug!("{} sealed {} messages", msg, sealed);
                }
                Ok(disposition) => warn!("{} not executed: {:?}", msg, disposition),
                Err(EngineError::Recoverable(e)) => warn!("Rejected {}: {}", msg, e),
                Err(fatal) => {
                    error!("Stopping node after {}: {}", msg, fatal);
                    return Err(NodeError::Fatal(fatal));
                }
            },
            _ => match msg.validate(engine.state()) {
                Validity::Valid => {
                    if state.accept(msg.clone()) {
                        info!("Accepted {} into process list", msg);
                    }
                }
                Validity::Undecided => debug!("Holding back undecided {}", msg),
                Validity::Invalid => warn!("Dropping invalid {} ({})", msg, msg.hash()),
            },
        }
    }

    debug!("Inbound queue closed, follower worker exiting");
    Ok(())
}
