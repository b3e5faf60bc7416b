//! Protocol messages and the capability set every message implements.
//!
//! The first byte of every wire payload is the [`MessageType`] tag.
//! [`Message::unmarshal`] dispatches on that tag alone; the per-type
//! decoders then parse the full payload and fail closed.

pub mod dbsig;
pub mod eom;
pub mod signable;

use std::fmt;

use async_trait::async_trait;
use tally_common::{auth::Authenticator, codec::decode_u8, FullSignature, Hash};

use crate::error::MessageError;
use crate::state::NodeState;
use dbsig::DirectoryBlockSignature;
use eom::Eom;
use signable::Signable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Eom = 0,
    DirectoryBlockSignature = 5,
}

impl MessageType {
    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MessageType {
    type Error = MessageError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(MessageType::Eom),
            5 => Ok(MessageType::DirectoryBlockSignature),
            other => Err(MessageError::UnknownMessageType(other)),
        }
    }
}

/// Outcome of checking a message against current node state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    /// Permanently invalid; discard.
    Invalid,
    /// Cannot decide yet; retry once more state is known.
    Undecided,
    Valid,
}

impl Validity {
    pub fn as_i8(self) -> i8 {
        match self {
            Validity::Invalid => -1,
            Validity::Undecided => 0,
            Validity::Valid => 1,
        }
    }
}

/// Role-dispatched execution hooks.
///
/// The engine asks `validate`, then runs the leader transition if
/// `is_leader` and the follower transition if `is_follower`.
#[async_trait]
pub trait ConsensusMessage: Send + Sync {
    fn validate(&self, state: &dyn NodeState) -> Validity;

    fn is_leader(&self, state: &dyn NodeState) -> bool;

    async fn leader_execute(&self, state: &dyn NodeState) -> Result<(), MessageError>;

    fn is_follower(&self, state: &dyn NodeState) -> bool;

    async fn follower_execute(&self, state: &dyn NodeState) -> Result<(), MessageError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Eom(Eom),
    DirectoryBlockSignature(DirectoryBlockSignature),
}

impl Message {
    /// Decodes a wire payload, routing on its leading type tag.
    pub fn unmarshal(data: &[u8]) -> Result<Self, MessageError> {
        let (tag, _) = decode_u8(data)?;
        match MessageType::try_from(tag)? {
            MessageType::Eom => Ok(Message::Eom(Eom::unmarshal_binary(data)?)),
            MessageType::DirectoryBlockSignature => Ok(Message::DirectoryBlockSignature(
                DirectoryBlockSignature::unmarshal_binary(data)?,
            )),
        }
    }

    pub fn marshal_binary(&self) -> Vec<u8> {
        match self {
            Message::Eom(m) => m.marshal_binary(),
            Message::DirectoryBlockSignature(m) => m.marshal_binary(),
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Eom(_) => MessageType::Eom,
            Message::DirectoryBlockSignature(_) => MessageType::DirectoryBlockSignature,
        }
    }

    pub fn hash(&self) -> Hash {
        match self {
            Message::Eom(m) => m.hash(),
            Message::DirectoryBlockSignature(m) => m.hash(),
        }
    }

    /// Height of the directory block the message belongs to.
    pub fn directory_block_height(&self) -> u32 {
        match self {
            Message::Eom(m) => m.directory_block_height,
            Message::DirectoryBlockSignature(m) => m.directory_block_height,
        }
    }

    fn as_consensus(&self) -> &dyn ConsensusMessage {
        match self {
            Message::Eom(m) => m,
            Message::DirectoryBlockSignature(m) => m,
        }
    }
}

impl Signable for Message {
    fn marshal_for_signature(&self) -> Vec<u8> {
        match self {
            Message::Eom(m) => m.marshal_for_signature(),
            Message::DirectoryBlockSignature(m) => m.marshal_for_signature(),
        }
    }

    fn signature(&self) -> Option<&FullSignature> {
        match self {
            Message::Eom(m) => m.signature(),
            Message::DirectoryBlockSignature(m) => m.signature(),
        }
    }

    fn sign(&mut self, key: &dyn Authenticator) -> Result<FullSignature, MessageError> {
        match self {
            Message::Eom(m) => m.sign(key),
            Message::DirectoryBlockSignature(m) => m.sign(key),
        }
    }
}

#[async_trait]
impl ConsensusMessage for Message {
    fn validate(&self, state: &dyn NodeState) -> Validity {
        self.as_consensus().validate(state)
    }

    fn is_leader(&self, state: &dyn NodeState) -> bool {
        self.as_consensus().is_leader(state)
    }

    async fn leader_execute(&self, state: &dyn NodeState) -> Result<(), MessageError> {
        self.as_consensus().leader_execute(state).await
    }

    fn is_follower(&self, state: &dyn NodeState) -> bool {
        self.as_consensus().is_follower(state)
    }

    async fn follower_execute(&self, state: &dyn NodeState) -> Result<(), MessageError> {
        self.as_consensus().follower_execute(state).await
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Eom(m) => write!(f, "{}", m),
            Message::DirectoryBlockSignature(m) => write!(f, "{}", m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_common::{CodecError, Timestamp};

    #[test]
    fn test_type_tags() {
        assert_eq!(MessageType::Eom.tag(), 0);
        assert_eq!(MessageType::DirectoryBlockSignature.tag(), 5);
        assert!(matches!(
            MessageType::try_from(3),
            Err(MessageError::UnknownMessageType(3))
        ));
    }

    #[test]
    fn test_dispatch_by_tag() {
        let eom = Eom::new(Timestamp::from_millis(1), 3, 7, Hash::sha(b"id")).unwrap();
        let decoded = Message::unmarshal(&eom.marshal_binary()).unwrap();
        assert_eq!(decoded.message_type(), MessageType::Eom);
        assert_eq!(decoded.directory_block_height(), 7);
        assert_eq!(decoded, Message::Eom(eom));

        let dbs = DirectoryBlockSignature::new(
            Timestamp::from_millis(2),
            7,
            Hash::sha(b"key"),
            Hash::sha(b"id"),
        );
        let decoded = Message::unmarshal(&dbs.marshal_binary()).unwrap();
        assert_eq!(decoded.message_type(), MessageType::DirectoryBlockSignature);
        assert_eq!(decoded.hash(), dbs.hash());
    }

    #[test]
    fn test_empty_and_unknown_payloads() {
        assert!(matches!(
            Message::unmarshal(&[]),
            Err(MessageError::Codec(CodecError::TruncatedInput { .. }))
        ));
        assert!(matches!(
            Message::unmarshal(&[42, 0, 0]),
            Err(MessageError::UnknownMessageType(42))
        ));
    }

    #[test]
    fn test_sign_through_envelope() {
        use ed25519_dalek::SigningKey;
        use rand::rngs::OsRng;
        use tally_common::auth::ed25519::Ed25519Authenticator;

        let key = Ed25519Authenticator::new(SigningKey::generate(&mut OsRng));
        let mut msg = Message::Eom(Eom::new(Timestamp::now(), 2, 1, Hash::sha(b"id")).unwrap());

        let sig = msg.sign(&key).unwrap();
        assert_eq!(msg.signature(), Some(&sig));
        assert_eq!(sig.public_key, key.public_key());
        assert!(msg.verify_signature().unwrap());
    }

    #[test]
    fn test_validity_values() {
        assert_eq!(Validity::Invalid.as_i8(), -1);
        assert_eq!(Validity::Undecided.as_i8(), 0);
        assert_eq!(Validity::Valid.as_i8(), 1);
    }
}
