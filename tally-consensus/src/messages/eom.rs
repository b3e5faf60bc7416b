//! eom.rs
//!
//! End-of-minute message: announces that minute `N` of a directory block
//! has closed.
//!
//! Wire layout, big-endian, no padding:
//!
//! | size | field |
//! |------|-------|
//! | 1    | type tag (0) |
//! | 6    | timestamp |
//! | 1    | minute, 0..=9 |
//! | 4    | directory block height |
//! | 32   | identity chain id |
//! | 96   | signature, present iff bytes remain |

use std::fmt;
use std::sync::OnceLock;

use async_trait::async_trait;
use tally_common::{
    auth::Authenticator,
    codec::{decode_fixed32, decode_u8, encode_fixed32},
    BinaryMarshal, CodecError, FullSignature, Hash, NetworkProfile, Timestamp,
};
use tracing::{debug, info};

use super::{
    dbsig::DirectoryBlockSignature,
    signable::{sign_signable, Signable},
    ConsensusMessage, Message, MessageType, Validity,
};
use crate::error::MessageError;
use crate::state::{enqueue, NodeState};

pub const MINUTES_PER_BLOCK: u8 = 10;
pub const LAST_MINUTE: u8 = MINUTES_PER_BLOCK - 1;

#[derive(Clone)]
pub struct Eom {
    pub timestamp: Timestamp,
    pub minute: u8,
    pub directory_block_height: u32,
    pub identity_chain_id: Hash,
    pub signature: Option<FullSignature>,

    // Not marshalled. Filled on first `hash()` and never recomputed.
    hash: OnceLock<Hash>,
}

impl Eom {
    pub fn new(
        timestamp: Timestamp,
        minute: u8,
        directory_block_height: u32,
        identity_chain_id: Hash,
    ) -> Result<Self, MessageError> {
        check_minute(minute)?;
        Ok(Eom {
            timestamp,
            minute,
            directory_block_height,
            identity_chain_id,
            signature: None,
            hash: OnceLock::new(),
        })
    }

    pub fn is_last_minute(&self) -> bool {
        self.minute == LAST_MINUTE
    }

    /// SHA-256 of the canonical payload.
    pub fn hash(&self) -> Hash {
        *self
            .hash
            .get_or_init(|| Hash::sha(&self.marshal_for_signature()))
    }

    pub fn marshal_binary(&self) -> Vec<u8> {
        let mut buf = self.marshal_for_signature();
        if let Some(sig) = &self.signature {
            buf.extend_from_slice(&sig.marshal_binary());
        }
        buf
    }

    /// Decodes a complete wire payload.
    ///
    /// The message is only assembled once every field has parsed, so a
    /// failure never leaves a half-filled message behind.
    pub fn unmarshal_binary(data: &[u8]) -> Result<Self, MessageError> {
        let (tag, rest) = decode_u8(data)?;
        if tag != MessageType::Eom.tag() {
            return Err(CodecError::MalformedMessage(format!(
                "expected EOM tag {}, found {}",
                MessageType::Eom.tag(),
                tag
            ))
            .into());
        }

        let (timestamp, rest) = Timestamp::unmarshal_binary_data(rest)?;

        let (minute, rest) = decode_u8(rest)?;
        check_minute(minute)?;

        let (directory_block_height, rest) = decode_fixed32(rest)?;
        let (identity_chain_id, rest) = Hash::unmarshal_binary_data(rest)?;

        let signature = if rest.is_empty() {
            None
        } else {
            Some(FullSignature::unmarshal_binary(rest)?)
        };

        Ok(Eom {
            timestamp,
            minute,
            directory_block_height,
            identity_chain_id,
            signature,
            hash: OnceLock::new(),
        })
    }
}

fn check_minute(minute: u8) -> Result<(), CodecError> {
    if minute >= MINUTES_PER_BLOCK {
        return Err(CodecError::OutOfRange {
            field: "minute",
            value: minute as u64,
        });
    }
    Ok(())
}

impl Signable for Eom {
    fn marshal_for_signature(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + Timestamp::ENCODED_LENGTH + 1 + 4 + 32);
        buf.push(MessageType::Eom.tag());
        buf.extend_from_slice(&self.timestamp.marshal_binary());
        buf.push(self.minute);
        buf.extend_from_slice(&encode_fixed32(self.directory_block_height));
        buf.extend_from_slice(&self.identity_chain_id.marshal_binary());
        buf
    }

    fn signature(&self) -> Option<&FullSignature> {
        self.signature.as_ref()
    }

    fn sign(&mut self, key: &dyn Authenticator) -> Result<FullSignature, MessageError> {
        let signature = sign_signable(self, key)?;
        self.signature = Some(signature);
        Ok(signature)
    }
}

#[async_trait]
impl ConsensusMessage for Eom {
    fn validate(&self, _state: &dyn NodeState) -> Validity {
        Validity::Valid
    }

    /// Minute closings are followed, never led. Leadership happens when the
    /// EOM that closes a block comes back through the leader-in queue.
    fn is_leader(&self, _state: &dyn NodeState) -> bool {
        false
    }

    /// Signs the previous directory block's key and publishes the signature
    /// to the network and to this node's own inbound queue.
    async fn leader_execute(&self, state: &dyn NodeState) -> Result<(), MessageError> {
        let mut dbs = DirectoryBlockSignature::new(
            Timestamp::now(),
            state.directory_block_height(),
            state.previous_directory_block_key(),
            state.identity_chain_id(),
        );
        dbs.sign(state.signing_key())?;

        info!(
            target: "consensus",
            "EVENT:DBSIG height={} key_mr={} hash={}",
            dbs.directory_block_height,
            dbs.directory_block_key_mr,
            dbs.hash()
        );

        let msg = Message::DirectoryBlockSignature(dbs);
        enqueue(state.network_out_queue(), msg.clone(), "network out").await?;
        enqueue(state.in_queue(), msg, "in").await?;
        Ok(())
    }

    fn is_follower(&self, _state: &dyn NodeState) -> bool {
        true
    }

    async fn follower_execute(&self, state: &dyn NodeState) -> Result<(), MessageError> {
        let accepted = state.process_list_slot(0);
        debug!("{}: replaying {} process list entries", self, accepted.len());

        for (index, msg) in accepted.iter().enumerate() {
            if let Err(e) = msg.follower_execute(state).await {
                return Err(MessageError::ReplayFailure {
                    index,
                    hash: msg.hash(),
                    source: Box::new(e),
                });
            }
        }

        state.notify_minute_ended(self.minute);

        let number = state.network_number();
        match NetworkProfile::try_from(number) {
            Ok(NetworkProfile::Local) => {}
            // main and test have no close-of-minute action yet
            Ok(NetworkProfile::Main) | Ok(NetworkProfile::Test) | Err(_) => {
                return Err(MessageError::UnsupportedProfile(number));
            }
        }

        info!(
            target: "consensus",
            "EVENT:EOM minute={} height={} hash={}",
            self.minute,
            self.directory_block_height,
            self.hash()
        );

        if self.is_last_minute() {
            state.process_end_of_block();
            if state.server_capacity() {
                enqueue(state.leader_in_queue(), Message::Eom(self.clone()), "leader in").await?;
            }
        }

        Ok(())
    }
}

impl PartialEq for Eom {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
            && self.minute == other.minute
            && self.directory_block_height == other.directory_block_height
            && self.identity_chain_id == other.identity_chain_id
            && self.signature == other.signature
    }
}

impl Eq for Eom {}

impl fmt::Debug for Eom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Eom")
            .field("timestamp", &self.timestamp)
            .field("minute", &self.minute)
            .field("directory_block_height", &self.directory_block_height)
            .field("identity_chain_id", &self.identity_chain_id)
            .field("signed", &self.signature.is_some())
            .finish()
    }
}

impl fmt::Display for Eom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EOM({}), DirectoryBlockHeight({})",
            u16::from(self.minute) + 1,
            self.directory_block_height
        )
    }
}
