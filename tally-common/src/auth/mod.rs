pub mod ed25519;

use thiserror::Error;

use crate::crypto::signature::FullSignature;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Secret key material is not 32 bytes.
    #[error("Invalid key length: {0}")]
    InvalidKeyLength(usize),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Signing failed: {0}")]
    Signing(String),
}

/// A signing identity.
///
/// Execution code only ever sees a node's key through this trait, so tests
/// and alternative key stores can stand in for the Ed25519 implementation.
pub trait Authenticator: Send + Sync {
    fn sign(&self, message: &[u8]) -> Result<FullSignature, AuthError>;

    fn public_key(&self) -> [u8; 32];
}
