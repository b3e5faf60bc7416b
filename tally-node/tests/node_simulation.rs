use std::future::Future;
use std::time::Duration;

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use tally_common::{
    auth::{ed25519::Ed25519Authenticator, Authenticator},
    Hash, NetworkProfile, Timestamp,
};
use tally_consensus::{DirectoryBlockSignature, Eom, NodeState, Signable};
use tally_node::{build_runtime, network::LoopbackNetwork, Config, NodeError};

fn key() -> Ed25519Authenticator {
    Ed25519Authenticator::new(SigningKey::generate(&mut OsRng))
}

fn config(node_id: &str, producer: bool) -> Config {
    Config {
        node_id: node_id.to_string(),
        server_mode: producer,
        produce_minutes: producer,
        minute_duration_ms: 10,
        ..Config::default()
    }
}

/// Polls `check` until it holds or five seconds pass.
async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .is_ok()
}

async fn within<T>(fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("timed out")
}

fn signed_eom(minute: u8, height: u32) -> Eom {
    let mut eom = Eom::new(Timestamp::now(), minute, height, Hash::sha(b"remote")).unwrap();
    eom.sign(&key()).unwrap();
    eom
}

#[tokio::test]
async fn test_single_producer_closes_block_and_signs_it() {
    let network = LoopbackNetwork::new();
    let signing_key = key();
    let public_key = signing_key.public_key();

    let mut node = build_runtime(&config("leader", true), signing_key, &network).unwrap();
    let state = node.state.clone();

    assert!(eventually(|| !state.signatures().is_empty()).await);

    let first_key = state.block_keys()[0];
    let signatures = state.signatures();
    let sig = &signatures[0];
    assert_eq!(sig.directory_block_key_mr, first_key);
    assert_eq!(sig.directory_block_height, 1);
    assert_eq!(sig.server_identity_chain_id, Hash::sha(&public_key));
    assert_eq!(sig.signature.map(|s| s.public_key), Some(public_key));
    assert!(sig.verify_signature().unwrap());

    node.shutdown();
}

#[tokio::test]
async fn test_follower_tracks_remote_producer() {
    let network = LoopbackNetwork::new();

    let mut leader = build_runtime(&config("leader", true), key(), &network).unwrap();
    let mut follower = build_runtime(&config("follower", false), key(), &network).unwrap();
    assert_eq!(network.node_ids(), vec!["follower", "leader"]);

    let leader_state = leader.state.clone();
    let follower_state = follower.state.clone();

    assert!(eventually(|| follower_state.height() >= 1).await);
    assert!(eventually(|| !follower_state.signatures().is_empty()).await);
    assert!(eventually(|| !leader_state.signatures().is_empty()).await);

    // Both nodes closed block 0 over the same (empty) message set.
    assert_eq!(
        follower_state.block_keys()[0],
        leader_state.block_keys()[0]
    );
    assert_eq!(
        follower_state.signatures()[0].hash(),
        leader_state.signatures()[0].hash()
    );
    assert!(!follower_state.server_capacity());

    leader.shutdown();
    follower.shutdown();
}

#[tokio::test]
async fn test_malformed_bytes_are_dropped() {
    let network = LoopbackNetwork::new();
    let mut node = build_runtime(&config("quiet", false), key(), &network).unwrap();
    let state = node.state.clone();

    node.ingress.send(vec![0xFF; 3]).await.unwrap();
    node.ingress.send(vec![0; 20]).await.unwrap();
    node.ingress
        .send(signed_eom(4, 0).marshal_binary())
        .await
        .unwrap();

    assert!(eventually(|| state.ended_minutes() == vec![4]).await);

    node.shutdown();
}

#[tokio::test]
async fn test_repeat_delivery_executes_once() {
    let network = LoopbackNetwork::new();
    let mut node = build_runtime(&config("dup", false), key(), &network).unwrap();
    let state = node.state.clone();

    let bytes = signed_eom(9, 0).marshal_binary();
    node.ingress.send(bytes.clone()).await.unwrap();
    node.ingress.send(bytes).await.unwrap();
    node.ingress
        .send(signed_eom(0, 1).marshal_binary())
        .await
        .unwrap();

    assert!(eventually(|| state.ended_minutes() == vec![0]).await);
    assert_eq!(state.height(), 1);

    node.shutdown();
}

#[tokio::test]
async fn test_unsupported_profile_stops_node() {
    let network = LoopbackNetwork::new();
    let cfg = Config {
        network: NetworkProfile::Main,
        ..config("mainnet", false)
    };
    let mut node = build_runtime(&cfg, key(), &network).unwrap();

    node.ingress
        .send(signed_eom(2, 0).marshal_binary())
        .await
        .unwrap();

    let result = within(node.wait()).await;
    match result {
        Err(NodeError::Fatal(e)) => assert!(e.is_fatal()),
        other => panic!("expected fatal stop, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let network = LoopbackNetwork::new();
    let cfg = Config {
        queue_capacity: 0,
        ..config("broken", false)
    };
    assert!(matches!(
        build_runtime(&cfg, key(), &network),
        Err(NodeError::Config(_))
    ));
    assert!(network.node_ids().is_empty());
}

fn dbs_for(identity: Hash, signer: &Ed25519Authenticator) -> DirectoryBlockSignature {
    let mut dbs = DirectoryBlockSignature::new(Timestamp::now(), 0, Hash::sha(b"block"), identity);
    dbs.sign(signer).unwrap();
    dbs
}

#[tokio::test]
async fn test_impersonated_dbsig_is_never_recorded() {
    let network = LoopbackNetwork::new();
    let mut node = build_runtime(&config("guard", false), key(), &network).unwrap();
    let state = node.state.clone();

    let victim = key();
    let identity = Hash::sha(&victim.public_key());
    let forged = dbs_for(identity, &key());
    let genuine = dbs_for(identity, &victim);

    node.ingress.send(forged.marshal_binary()).await.unwrap();
    node.ingress.send(genuine.marshal_binary()).await.unwrap();
    node.ingress
        .send(signed_eom(1, 0).marshal_binary())
        .await
        .unwrap();

    assert!(eventually(|| state.ended_minutes() == vec![1]).await);
    assert_eq!(state.signatures(), vec![genuine]);

    node.shutdown();
}

#[tokio::test]
async fn test_foreign_identity_requires_binding_off() {
    let network = LoopbackNetwork::new();
    let cfg = Config {
        identity_chain_id: Some(Hash::sha(b"someone else")),
        ..config("borrowed", false)
    };
    assert!(matches!(
        build_runtime(&cfg, key(), &network),
        Err(NodeError::Config(_))
    ));

    let unbound = Config {
        bind_identity: false,
        ..cfg
    };
    let mut node = build_runtime(&unbound, key(), &network).unwrap();
    assert_eq!(node.state.identity_chain_id(), Hash::sha(b"someone else"));
    node.shutdown();
}
