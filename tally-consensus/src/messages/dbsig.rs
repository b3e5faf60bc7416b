//! Directory block signature: a server's commitment to the key of the
//! directory block that just closed.
//!
//! Wire layout: tag (5) · timestamp (6) · height (4) · key MR (32) ·
//! server identity (32) · signature (96, optional).

use std::fmt;
use std::sync::OnceLock;

use async_trait::async_trait;
use tally_common::{
    auth::Authenticator,
    codec::{decode_fixed32, decode_u8, encode_fixed32},
    BinaryMarshal, CodecError, FullSignature, Hash, Timestamp,
};
use tracing::debug;

use super::{
    signable::{sign_signable, verify_with_identity, Signable},
    ConsensusMessage, MessageType, Validity,
};
use crate::error::MessageError;
use crate::state::NodeState;

#[derive(Clone)]
pub struct DirectoryBlockSignature {
    pub timestamp: Timestamp,
    pub directory_block_height: u32,
    pub directory_block_key_mr: Hash,
    pub server_identity_chain_id: Hash,
    pub signature: Option<FullSignature>,

    hash: OnceLock<Hash>,
}

impl DirectoryBlockSignature {
    pub fn new(
        timestamp: Timestamp,
        directory_block_height: u32,
        directory_block_key_mr: Hash,
        server_identity_chain_id: Hash,
    ) -> Self {
        DirectoryBlockSignature {
            timestamp,
            directory_block_height,
            directory_block_key_mr,
            server_identity_chain_id,
            signature: None,
            hash: OnceLock::new(),
        }
    }

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

    pub fn unmarshal_binary(data: &[u8]) -> Result<Self, MessageError> {
        let (tag, rest) = decode_u8(data)?;
        if tag != MessageType::DirectoryBlockSignature.tag() {
            return Err(CodecError::MalformedMessage(format!(
                "expected DBSig tag {}, found {}",
                MessageType::DirectoryBlockSignature.tag(),
                tag
            ))
            .into());
        }

        let (timestamp, rest) = Timestamp::unmarshal_binary_data(rest)?;
        let (directory_block_height, rest) = decode_fixed32(rest)?;
        let (directory_block_key_mr, rest) = Hash::unmarshal_binary_data(rest)?;
        let (server_identity_chain_id, rest) = Hash::unmarshal_binary_data(rest)?;

        let signature = if rest.is_empty() {
            None
        } else {
            Some(FullSignature::unmarshal_binary(rest)?)
        };

        Ok(DirectoryBlockSignature {
            timestamp,
            directory_block_height,
            directory_block_key_mr,
            server_identity_chain_id,
            signature,
            hash: OnceLock::new(),
        })
    }

    /// Checks the signature and, when `state` asks for it, that the signing
    /// key belongs to `server_identity_chain_id`.
    fn verify_for(&self, state: &dyn NodeState) -> Result<bool, MessageError> {
        if state.require_identity_binding() {
            verify_with_identity(self, &self.server_identity_chain_id)
        } else {
            self.verify_signature()
        }
    }
}

impl Signable for DirectoryBlockSignature {
    fn marshal_for_signature(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + Timestamp::ENCODED_LENGTH + 4 + 64);
        buf.push(MessageType::DirectoryBlockSignature.tag());
        buf.extend_from_slice(&self.timestamp.marshal_binary());
        buf.extend_from_slice(&encode_fixed32(self.directory_block_height));
        buf.extend_from_slice(&self.directory_block_key_mr.marshal_binary());
        buf.extend_from_slice(&self.server_identity_chain_id.marshal_binary());
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
impl ConsensusMessage for DirectoryBlockSignature {
    /// Unsigned, forged or impersonating signatures are never valid.
    fn validate(&self, state: &dyn NodeState) -> Validity {
        if matches!(self.verify_for(state), Ok(true)) {
            Validity::Valid
        } else {
            Validity::Invalid
        }
    }

    fn is_leader(&self, _state: &dyn NodeState) -> bool {
        false
    }

    async fn leader_execute(&self, _state: &dyn NodeState) -> Result<(), MessageError> {
        Ok(())
    }

    fn is_follower(&self, _state: &dyn NodeState) -> bool {
        true
    }

    async fn follower_execute(&self, state: &dyn NodeState) -> Result<(), MessageError> {
        if !self.verify_for(state)? {
            return Err(MessageError::VerificationFailure(format!(
                "directory block signature {} does not verify",
                self.hash()
            )));
        }
        debug!("Recording {}", self);
        state.record_directory_block_signature(self);
        Ok(())
    }
}

impl PartialEq for DirectoryBlockSignature {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
            && self.directory_block_height == other.directory_block_height
            && self.directory_block_key_mr == other.directory_block_key_mr
            && self.server_identity_chain_id == other.server_identity_chain_id
            && self.signature == other.signature
    }
}

impl Eq for DirectoryBlockSignature {}

impl fmt::Debug for DirectoryBlockSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryBlockSignature")
            .field("timestamp", &self.timestamp)
            .field("directory_block_height", &self.directory_block_height)
            .field("directory_block_key_mr", &self.directory_block_key_mr)
            .field("server_identity_chain_id", &self.server_identity_chain_id)
            .field("signed", &self.signature.is_some())
            .finish()
    }
}

impl fmt::Display for DirectoryBlockSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DBSig(height {}, key_mr {})",
            self.directory_block_height, self.directory_block_key_mr
        )
    }
}
