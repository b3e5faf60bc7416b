use std::time::Duration;

use tally_consensus::{messages::eom::MINUTES_PER_BLOCK, EngineError, ExecutionEngine, Message};
use tokio::sync::mpsc::Receiver;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use crate::error::NodeError;

/// Consumes the leader-in queue and, when `produce_minutes` is set, closes
/// one minute every `minute_duration`.
pub async fn run_leader(
    engine: ExecutionEngine,
    mut leader_in: Receiver<Message>,
    produce_minutes: bool,
    minute_duration: Duration,
) -> Result<(), NodeError> {
    let mut ticker = time::interval_at(Instant::now() + minute_duration, minute_duration);
    let mut minute: u8 = 0;

    loop {
        tokio::select! {
            maybe_msg = leader_in.recv() => {
                let Some(msg) = maybe_msg else {
                    debug!("Leader queue closed, leader worker exiting");
                    return Ok(());
                };
                debug!("Leading {}", msg);
                check(engine.lead(&msg).await)?;
            }
            _ = ticker.tick(), if produce_minutes => {
                match engine.close_minute(minute).await {
                    Ok(msg) => info!("Closed minute {}: {}", minute, msg),
                    Err(e) => check(Err(e))?,
                }
                minute = (minute + 1) % MINUTES_PER_BLOCK;
            }
        }
    }
}

fn check(result: Result<(), EngineError>) -> Result<(), NodeError> {
    match result {
        Ok(()) => Ok(()),
        Err(EngineError::Recoverable(e)) => {
            warn!("Leader step failed: {}", e);
            Ok(())
        }
        Err(fatal) => {
            error!("Stopping node: {}", fatal);
            Err(NodeError::Fatal(fatal))
        }
    }
}
