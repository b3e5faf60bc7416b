use std::fmt;

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;
use crate::codec::{take_array, BinaryMarshal, DecodeResult};
use crate::crypto::hash::Hash;

pub const PUBLIC_KEY_LENGTH: usize = 32;
pub const SIGNATURE_LENGTH: usize = 64;

/// A detached Ed25519 signature together with the key that produced it.
///
/// Wire form is `public_key || signature`, 96 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullSignature {
    #[serde(with = "hex::serde")]
    pub public_key: [u8; PUBLIC_KEY_LENGTH],
    #[serde(with = "hex::serde")]
    pub signature: [u8; SIGNATURE_LENGTH],
}

impl FullSignature {
    pub const ENCODED_LENGTH: usize = PUBLIC_KEY_LENGTH + SIGNATURE_LENGTH;

    /// Checks the signature over `message` against the embedded key.
    ///
    /// `Ok(false)` means well-formed material that does not match; an
    /// error means the key bytes are not a valid Ed25519 point.
    pub fn verify(&self, message: &[u8]) -> Result<bool, AuthError> {
        let verifying_key = VerifyingKey::from_bytes(&self.public_key)
            .map_err(|e| AuthError::InvalidPublicKey(e.to_string()))?;
        let signature = Signature::from_bytes(&self.signature);

        Ok(verifying_key.verify(message, &signature).is_ok())
    }

    /// Identity derived from the signing key.
    pub fn key_hash(&self) -> Hash {
        Hash::sha(&self.public_key)
    }
}

impl BinaryMarshal for FullSignature {
    fn marshal_binary(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::ENCODED_LENGTH);
        buf.extend_from_slice(&self.public_key);
        buf.extend_from_slice(&self.signature);
        buf
    }

    fn unmarshal_binary_data(data: &[u8]) -> DecodeResult<'_, Self> {
        let (public_key, rest) = take_array::<PUBLIC_KEY_LENGTH>(data)?;
        let (signature, rest) = take_array::<SIGNATURE_LENGTH>(rest)?;
        Ok((FullSignature { public_key, signature }, rest))
    }
}

impl fmt::Debug for FullSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FullSignature")
            .field("public_key", &hex::encode(self.public_key))
            .field("signature", &hex::encode(&self.signature[..8]))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ed25519::Ed25519Authenticator, Authenticator};
    use crate::error::CodecError;
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    fn signer() -> Ed25519Authenticator {
        Ed25519Authenticator::new(SigningKey::generate(&mut OsRng))
    }

    #[test]
    fn test_wire_form() {
        let sig = signer().sign(b"payload").unwrap();
        let bytes = sig.marshal_binary();
        assert_eq!(bytes.len(), FullSignature::ENCODED_LENGTH);
        assert_eq!(&bytes[..32], &sig.public_key);

        let back = FullSignature::unmarshal_binary(&bytes).unwrap();
        assert_eq!(back, sig);
        assert!(back.verify(b"payload").unwrap());
    }

    #[test]
    fn test_truncated_inside_signature() {
        let bytes = signer().sign(b"payload").unwrap().marshal_binary();
        assert!(matches!(
            FullSignature::unmarshal_binary_data(&bytes[..50]),
            Err(CodecError::TruncatedInput { needed: 64, remaining: 18 })
        ));
    }

    #[test]
    fn test_verify_wrong_message() {
        let sig = signer().sign(b"payload").unwrap();
        assert!(!sig.verify(b"other").unwrap());
    }
}
