use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::codec::{take_array, BinaryMarshal, DecodeResult};
use crate::error::CodecError;

pub const HASH_LENGTH: usize = 32;

/// Fixed-length 32-byte hash.
///
/// Used both as a content address (message hash, directory block key) and
/// as an opaque identity chain id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Hash(#[serde(with = "hex::serde")] pub [u8; HASH_LENGTH]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; HASH_LENGTH]);

    /// SHA-256 of `data`.
    pub fn sha(data: &[u8]) -> Self {
        Hash(Sha256::digest(data).into())
    }

    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        let mut out = [0u8; HASH_LENGTH];
        hex::decode_to_slice(s, &mut out)
            .map_err(|e| CodecError::MalformedMessage(format!("bad hash hex: {}", e)))?;
        Ok(Hash(out))
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.0
    }
}

impl BinaryMarshal for Hash {
    fn marshal_binary(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    fn unmarshal_binary_data(data: &[u8]) -> DecodeResult<'_, Self> {
        let (bytes, rest) = take_array::<HASH_LENGTH>(data)?;
        Ok((Hash(bytes), rest))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", hex::encode(&self.0[..6]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha() {
        let hash = Hash::sha(b"hello world");
        assert_eq!(
            hash.to_string(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_hex_round_trip() {
        let hash = Hash::sha(b"identity");
        assert_eq!(Hash::from_hex(&hash.to_string()).unwrap(), hash);
        assert!(Hash::from_hex("abcd").is_err());
    }

    #[test]
    fn test_unmarshal_consumes_32_bytes() {
        let mut data = Hash::sha(b"x").marshal_binary();
        data.push(0xaa);
        let (hash, rest) = Hash::unmarshal_binary_data(&data).unwrap();
        assert_eq!(hash, Hash::sha(b"x"));
        assert_eq!(rest, &[0xaa]);

        assert!(matches!(
            Hash::unmarshal_binary_data(&data[..31]),
            Err(CodecError::TruncatedInput { needed: 32, remaining: 31 })
        ));
    }
}
