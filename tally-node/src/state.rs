//! In-memory node state behind the `NodeState` facade.
//!
//! Holds the process list, a factoid-ledger stand-in that records which
//! minutes have ended, and a directory-block chain stand-in. A block's key
//! is `SHA-256(previous key || height BE || hashes of its messages)`.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tally_common::{auth::Authenticator, Hash};
use tally_consensus::{DirectoryBlockSignature, Message, NodeState};
use tokio::sync::mpsc::Sender;
use tracing::{debug, info};

/// Sending halves of the queues execution may publish to.
#[derive(Clone)]
pub struct StateQueues {
    pub network_out: Sender<Message>,
    pub inbound: Sender<Message>,
    pub leader_in: Sender<Message>,
}

#[derive(Default)]
struct Inner {
    // Slot 0 is the one being filled for the current minute.
    process_list: Vec<Vec<Message>>,
    // Delivered messages of the current and previous block, by height.
    seen: HashSet<(u32, Hash)>,
    ended_minutes: Vec<u8>,
    height: u32,
    previous_key: Hash,
    block_messages: Vec<Hash>,
    block_keys: Vec<Hash>,
    signatures: Vec<DirectoryBlockSignature>,
}

pub struct LocalState {
    network: u8,
    server_mode: bool,
    bind_identity: bool,
    identity: Hash,
    signing_key: Box<dyn Authenticator>,
    queues: StateQueues,
    inner: Mutex<Inner>,
}

impl LocalState {
    pub fn new(
        network: u8,
        server_mode: bool,
        bind_identity: bool,
        identity: Hash,
        signing_key: Box<dyn Authenticator>,
        queues: StateQueues,
    ) -> Self {
        let inner = Inner {
            process_list: vec![Vec::new()],
            ..Inner::default()
        };
        Self {
            network,
            server_mode,
            bind_identity,
            identity,
            signing_key,
            queues,
            inner: Mutex::new(inner),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records `msg` as delivered. Returns false on a repeat delivery and
    /// for messages older than the previous block.
    pub fn observe(&self, msg: &Message) -> bool {
        let height = msg.directory_block_height();
        let mut inner = self.inner();
        if is_stale(height, inner.height) {
            return false;
        }
        inner.seen.insert((height, msg.hash()))
    }

    /// Appends `msg` to the active process list slot. Duplicates are ignored.
    pub fn accept(&self, msg: Message) -> bool {
        let hash = msg.hash();
        let mut inner = self.inner();
        let slot = &mut inner.process_list[0];
        if slot.iter().any(|m| m.hash() == hash) {
            return false;
        }
        slot.push(msg);
        true
    }

    /// Moves the active slot into the block under construction.
    pub fn seal_minute(&self) -> usize {
        let mut inner = self.inner();
        seal(&mut inner)
    }

    pub fn height(&self) -> u32 {
        self.inner().height
    }

    pub fn ended_minutes(&self) -> Vec<u8> {
        self.inner().ended_minutes.clone()
    }

    pub fn block_keys(&self) -> Vec<Hash> {
        self.inner().block_keys.clone()
    }

    pub fn signatures(&self) -> Vec<DirectoryBlockSignature> {
        self.inner().signatures.clone()
    }

    pub fn pending(&self) -> usize {
        self.inner().process_list[0].len()
    }
}

fn is_stale(height: u32, current: u32) -> bool {
    height.saturating_add(1) < current
}

fn seal(inner: &mut Inner) -> usize {
    let drained: Vec<Message> = inner.process_list[0].drain(..).collect();
    let count = drained.len();
    inner
        .block_messages
        .extend(drained.iter().map(Message::hash));
    count
}

fn block_key(previous: &Hash, height: u32, messages: &[Hash]) -> Hash {
    let mut data = Vec::with_capacity(32 + 4 + messages.len() * 32);
    data.extend_from_slice(previous.as_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    for hash in messages {
        data.extend_from_slice(hash.as_bytes());
    }
    Hash::sha(&data)
}

impl NodeState for LocalState {
    fn previous_directory_block_key(&self) -> Hash {
        self.inner().previous_key
    }

    fn directory_block_height(&self) -> u32 {
        self.inner().height
    }

    fn identity_chain_id(&self) -> Hash {
        self.identity
    }

    fn process_list_slot(&self, slot: usize) -> Vec<Message> {
        self.inner()
            .process_list
            .get(slot)
            .cloned()
            .unwrap_or_default()
    }

    fn notify_minute_ended(&self, minute: u8) {
        self.inner().ended_minutes.push(minute);
        debug!("Minute {} ended", minute);
    }

    fn record_directory_block_signature(&self, signature: &DirectoryBlockSignature) {
        let mut inner = self.inner();
        let hash = signature.hash();
        if inner.signatures.iter().any(|s| s.hash() == hash) {
            return;
        }
        debug!("Recorded {}", signature);
        inner.signatures.push(signature.clone());
    }

    fn network_number(&self) -> u8 {
        self.network
    }

    fn process_end_of_block(&self) {
        let mut inner = self.inner();
        seal(&mut inner);

        let key = block_key(&inner.previous_key, inner.height, &inner.block_messages);
        info!(
            target: "consensus",
            "EVENT:END_OF_BLOCK height={} key={} messages={}",
            inner.height,
            key,
            inner.block_messages.len()
        );

        inner.block_keys.push(key);
        inner.previous_key = key;
        inner.height += 1;
        inner.block_messages.clear();
        inner.ended_minutes.clear();

        let current = inner.height;
        inner.seen.retain(|(height, _)| !is_stale(*height, current));
    }

    fn server_capacity(&self) -> bool {
        self.server_mode
    }

    fn require_identity_binding(&self) -> bool {
        self.bind_identity
    }

    fn network_out_queue(&self) -> &Sender<Message> {
        &self.queues.network_out
    }

    fn in_queue(&self) -> &Sender<Message> {
        &self.queues.inbound
    }

    fn leader_in_queue(&self) -> &Sender<Message> {
        &self.queues.leader_in
    }

    fn signing_key(&self) -> &dyn Authenticator {
        self.signing_key.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;
    use tally_common::{auth::ed25519::Ed25519Authenticator, NetworkProfile, Timestamp};
    use tally_consensus::{Eom, Signable};
    use tokio::sync::mpsc;

    fn local_state() -> LocalState {
        let (network_out, _) = mpsc::channel(1);
        let (inbound, _) = mpsc::channel(1);
        let (leader_in, _) = mpsc::channel(1);
        LocalState::new(
            NetworkProfile::LOCAL,
            true,
            true,
            Hash::sha(b"identity"),
            Box::new(Ed25519Authenticator::new(SigningKey::generate(&mut OsRng))),
            StateQueues { network_out, inbound, leader_in },
        )
    }

    fn dbs(height: u32) -> Message {
        let key = Ed25519Authenticator::new(SigningKey::generate(&mut OsRng));
        let mut dbs = DirectoryBlockSignature::new(
            Timestamp::from_millis(1_000),
            height,
            Hash::sha(b"key"),
            Hash::sha(b"server"),
        );
        dbs.sign(&key).unwrap();
        Message::DirectoryBlockSignature(dbs)
    }

    #[test]
    fn test_accept_dedups() {
        let state = local_state();
        let msg = dbs(1);

        assert!(state.accept(msg.clone()));
        assert!(!state.accept(msg.clone()));
        assert!(state.accept(dbs(2)));
        assert_eq!(state.pending(), 2);
        assert_eq!(state.process_list_slot(0)[0], msg);
        assert!(state.process_list_slot(3).is_empty());
    }

    fn eom_at(minute: u8, height: u32) -> Message {
        Message::Eom(Eom::new(Timestamp::from_millis(5), minute, height, Hash::ZERO).unwrap())
    }

    #[test]
    fn test_observe() {
        let state = local_state();
        let msg = eom_at(3, 0);
        assert!(state.observe(&msg));
        assert!(!state.observe(&msg));
    }

    #[test]
    fn test_observe_window_follows_blocks() {
        let state = local_state();
        let old = eom_at(9, 0);
        assert!(state.observe(&old));

        state.process_end_of_block();
        assert!(!state.observe(&old));
        assert_eq!(state.inner().seen.len(), 1);

        state.process_end_of_block();
        assert_eq!(state.height(), 2);
        assert!(state.inner().seen.is_empty());

        // Pruned, yet a late copy still cannot run again.
        assert!(!state.observe(&old));
        assert!(state.inner().seen.is_empty());

        assert!(state.observe(&eom_at(0, 1)));
        assert!(state.observe(&eom_at(0, 2)));
        assert_eq!(state.inner().seen.len(), 2);
    }

    #[test]
    fn test_seal_minute_empties_slot() {
        let state = local_state();
        state.accept(dbs(1));
        assert_eq!(state.seal_minute(), 1);
        assert_eq!(state.pending(), 0);
        assert_eq!(state.seal_minute(), 0);
    }

    #[test]
    fn test_end_of_block_chains_keys() {
        let state = local_state();
        let a = dbs(1);
        let b = dbs(2);

        state.accept(a.clone());
        state.seal_minute();
        state.accept(b.clone());
        state.notify_minute_ended(9);
        state.process_end_of_block();

        let expected = block_key(&Hash::ZERO, 0, &[a.hash(), b.hash()]);
        assert_eq!(state.height(), 1);
        assert_eq!(state.previous_directory_block_key(), expected);
        assert_eq!(state.block_keys(), vec![expected]);
        assert_eq!(state.pending(), 0);
        assert!(state.ended_minutes().is_empty());

        state.process_end_of_block();
        let empty = block_key(&expected, 1, &[]);
        assert_eq!(state.previous_directory_block_key(), empty);
        assert_eq!(state.directory_block_height(), 2);
    }

    #[test]
    fn test_record_signature_once() {
        let state = local_state();
        let Message::DirectoryBlockSignature(sig) = dbs(4) else {
            unreachable!()
        };
        state.record_directory_block_signature(&sig);
        state.record_directory_block_signature(&sig);
        assert_eq!(state.signatures().len(), 1);
    }

    #[test]
    fn test_facade_values() {
        let state = local_state();
        assert_eq!(state.network_number(), NetworkProfile::LOCAL);
        assert!(state.server_capacity());
        assert!(state.require_identity_binding());
        assert_eq!(state.identity_chain_id(), Hash::sha(b"identity"));

        let eom = Eom::new(Timestamp::now(), 0, 0, state.identity_chain_id()).unwrap();
        let sig = state.signing_key().sign(&eom.marshal_for_signature()).unwrap();
        assert_eq!(sig.public_key, state.signing_key().public_key());
    }
}
