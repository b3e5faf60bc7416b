//! engine.rs
//!
//! Role dispatch for received messages.
//!
//! A message moves `Received -> validated -> executed`, or ends
//! `Rejected`/`Deferred` at validation. Execution errors come back
//! classified: recoverable ones reject a single message, fatal ones mean
//! the node's state has already diverged and it must stop.

use std::sync::Arc;

use tally_common::Timestamp;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::MessageError;
use crate::messages::{eom::Eom, signable::Signable, ConsensusMessage, Message, Validity};
use crate::state::{enqueue, NodeState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Validation said the message can never be valid.
    Rejected,
    /// Validation could not decide yet.
    Deferred,
    Executed { leader: bool, follower: bool },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Fatal: {0}")]
    Fatal(#[source] MessageError),

    #[error("Recoverable: {0}")]
    Recoverable(#[source] MessageError),
}

impl EngineError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Fatal(_))
    }
}

impl From<MessageError> for EngineError {
    fn from(e: MessageError) -> Self {
        if e.is_fatal() {
            EngineError::Fatal(e)
        } else {
            EngineError::Recoverable(e)
        }
    }
}

#[derive(Clone)]
pub struct ExecutionEngine {
    state: Arc<dyn NodeState>,
}

impl ExecutionEngine {
    pub fn new(state: Arc<dyn NodeState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &dyn NodeState {
        self.state.as_ref()
    }

    /// Decodes raw bytes from the network. Failures reject only this message.
    pub fn decode(&self, bytes: &[u8]) -> Result<Message, MessageError> {
        let msg = Message::unmarshal(bytes)?;
        debug!("Decoded {} ({} bytes)", msg, bytes.len());
        Ok(msg)
    }

    /// Validates `msg` and runs whichever role transitions apply to this node.
    pub async fn execute(&self, msg: &Message) -> Result<Disposition, EngineError> {
        let state = self.state();

        match msg.validate(state) {
            Validity::Invalid => {
                warn!("Rejected {} ({})", msg, msg.hash());
                return Ok(Disposition::Rejected);
            }
            Validity::Undecided => {
                debug!("Deferred {}", msg);
                return Ok(Disposition::Deferred);
            }
            Validity::Valid => {}
        }

        let leader = msg.is_leader(state);
        if leader {
            msg.leader_execute(state).await?;
        }

        let follower = msg.is_follower(state);
        if follower {
            msg.follower_execute(state).await?;
        }

        Ok(Disposition::Executed { leader, follower })
    }

    /// Runs the leader transition for a message taken off the leader-in queue.
    pub async fn lead(&self, msg: &Message) -> Result<(), EngineError> {
        msg.leader_execute(self.state()).await?;
        Ok(())
    }

    /// Leader production step: announce that `minute` of the current block
    /// has ended. The signed EOM goes out to the network and back into this
    /// node's own inbound queue.
    pub async fn close_minute(&self, minute: u8) -> Result<Message, EngineError> {
        let state = self.state();

        let mut eom = Eom::new(
            Timestamp::now(),
            minute,
            state.directory_block_height(),
            state.identity_chain_id(),
        )?;
        eom.sign(state.signing_key())?;

        let msg = Message::Eom(eom);
        enqueue(state.network_out_queue(), msg.clone(), "network out").await?;
        enqueue(state.in_queue(), msg.clone(), "in").await?;
        Ok(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_common::CodecError;

    #[test]
    fn test_promotion() {
        let fatal: EngineError = MessageError::UnsupportedProfile(9).into();
        assert!(fatal.is_fatal());

        let recoverable: EngineError =
            MessageError::Codec(CodecError::MalformedMessage("x".into())).into();
        assert!(!recoverable.is_fatal());
    }
}
