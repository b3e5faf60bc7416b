use tally_common::{auth::Authenticator, Hash};
use tokio::sync::mpsc;

use crate::error::MessageError;
use crate::messages::{dbsig::DirectoryBlockSignature, Message};

/// Everything message execution may read or change on the node.
///
/// Transitions receive this explicitly; there is no ambient node state.
/// Queues are bounded, so a send waits while the consumer is behind.
pub trait NodeState: Send + Sync {
    /// Content key of the last closed directory block.
    fn previous_directory_block_key(&self) -> Hash;

    /// Height of the directory block currently being built.
    fn directory_block_height(&self) -> u32;

    /// This node's identity chain id.
    fn identity_chain_id(&self) -> Hash;

    /// Snapshot of the accepted messages in a process list slot, in list order.
    fn process_list_slot(&self, slot: usize) -> Vec<Message>;

    /// Tells the factoid ledger that `minute` has ended.
    fn notify_minute_ended(&self, minute: u8);

    fn record_directory_block_signature(&self, signature: &DirectoryBlockSignature);

    /// Raw network number; see `NetworkProfile` for the known values.
    fn network_number(&self) -> u8;

    fn process_end_of_block(&self);

    /// Whether the node currently operates as a server.
    fn server_capacity(&self) -> bool;

    /// Require a signer's key to hash to the identity the message names.
    fn require_identity_binding(&self) -> bool {
        true
    }

    fn network_out_queue(&self) -> &mpsc::Sender<Message>;

    fn in_queue(&self) -> &mpsc::Sender<Message>;

    fn leader_in_queue(&self) -> &mpsc::Sender<Message>;

    fn signing_key(&self) -> &dyn Authenticator;
}

pub(crate) async fn enqueue(
    queue: &mpsc::Sender<Message>,
    msg: Message,
    name: &'static str,
) -> Result<(), MessageError> {
    queue
        .send(msg)
        .await
        .map_err(|_| MessageError::QueueClosed(name))
}
