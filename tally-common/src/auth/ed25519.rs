use ed25519_dalek::{Signer, SigningKey};

use super::{AuthError, Authenticator};
use crate::crypto::signature::FullSignature;

pub struct Ed25519Authenticator {
    keypair: SigningKey,
}

impl Ed25519Authenticator {
    pub fn new(keypair: SigningKey) -> Self {
        Self { keypair }
    }

    /// Builds an authenticator from a 32-byte secret seed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AuthError> {
        let seed: &[u8; 32] = bytes
            .try_into()
            .map_err(|_| AuthError::InvalidKeyLength(bytes.len()))?;
        Ok(Self {
            keypair: SigningKey::from_bytes(seed),
        })
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.keypair.to_bytes()
    }
}

impl Authenticator for Ed25519Authenticator {
    fn sign(&self, message: &[u8]) -> Result<FullSignature, AuthError> {
        let signature = self
            .keypair
            .try_sign(message)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        Ok(FullSignature {
            public_key: self.public_key(),
            signature: signature.to_bytes(),
        })
    }

    fn public_key(&self) -> [u8; 32] {
        self.keypair.verifying_key().to_bytes()
    }
}
