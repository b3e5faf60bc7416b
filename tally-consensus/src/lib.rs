//! Message contract and execution state machine for minute/block closing.
//!
//! Wire decoding, signing and the leader/follower transitions live here.
//! Everything a transition touches outside the message itself goes
//! through the [`NodeState`] facade, which the node runtime implements.

pub mod engine;
pub mod error;
pub mod messages;
pub mod state;

pub use engine::{Disposition, EngineError, ExecutionEngine};
pub use error::MessageError;
pub use messages::{
    dbsig::DirectoryBlockSignature,
    eom::Eom,
    signable::Signable,
    ConsensusMessage,
    Message,
    MessageType,
    Validity,
};
pub use state::NodeState;
