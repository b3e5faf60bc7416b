//! The signing discipline shared by all consensus messages.
//!
//! The bytes that get signed (`marshal_for_signature`) are kept separate
//! from the bytes on the wire, which append the signature afterwards.

use tally_common::{auth::Authenticator, FullSignature, Hash};

use crate::error::MessageError;

pub trait Signable {
    /// Canonical payload: every signed field, never the signature.
    fn marshal_for_signature(&self) -> Vec<u8>;

    fn signature(&self) -> Option<&FullSignature>;

    /// Signs the canonical payload and attaches the result.
    fn sign(&mut self, key: &dyn Authenticator) -> Result<FullSignature, MessageError>;

    fn verify_signature(&self) -> Result<bool, MessageError> {
        verify_message(self)
    }
}

pub fn sign_signable<S: Signable + ?Sized>(
    msg: &S,
    key: &dyn Authenticator,
) -> Result<FullSignature, MessageError> {
    key.sign(&msg.marshal_for_signature())
        .map_err(|e| MessageError::Signing(e.to_string()))
}

/// Recomputes the canonical payload and checks the attached signature.
pub fn verify_message<S: Signable + ?Sized>(msg: &S) -> Result<bool, MessageError> {
    let signature = msg.signature().ok_or(MessageError::NoSignature)?;
    signature
        .verify(&msg.marshal_for_signature())
        .map_err(|e| MessageError::VerificationFailure(e.to_string()))
}

/// Like [`verify_message`], and also requires the signing key to hash to `identity`.
pub fn verify_with_identity<S: Signable + ?Sized>(
    msg: &S,
    identity: &Hash,
) -> Result<bool, MessageError> {
    if !verify_message(msg)? {
        return Ok(false);
    }
    Ok(msg
        .signature()
        .map(|sig| sig.key_hash() == *identity)
        .unwrap_or(false))
}
