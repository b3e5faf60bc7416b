use tally_common::{CodecError, Hash};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Unknown message type {0}")]
    UnknownMessageType(u8),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Message carries no signature")]
    NoSignature,

    #[error("Signature verification failed: {0}")]
    VerificationFailure(String),

    /// A message already accepted into the process list could not be
    /// executed again. Local state no longer matches what the network agreed.
    #[error("Failed to replay process list entry {index} ({hash}): {source}")]
    ReplayFailure {
        index: usize,
        hash: Hash,
        #[source]
        source: Box<MessageError>,
    },

    /// The node runs on a network number with no close-of-minute action.
    #[error("No close-of-minute action for network number {0}")]
    UnsupportedProfile(u8),

    #[error("Queue closed: {0}")]
    QueueClosed(&'static str),
}

impl MessageError {
    /// Errors after which the node must stop rather than retry.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MessageError::ReplayFailure { .. } | MessageError::UnsupportedProfile(_)
        )
    }
}
