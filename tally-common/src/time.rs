use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::{decode_u48, encode_u48, BinaryMarshal, DecodeResult, U48_MAX};

/// Wall-clock marker carried by every consensus message.
///
/// Milliseconds since the UNIX epoch, encoded on the wire as a 6-byte
/// big-endian integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ENCODED_LENGTH: usize = 6;

    pub fn now() -> Self {
        Self::from_millis(Utc::now().timestamp_millis().max(0) as u64)
    }

    /// Values beyond the 48-bit wire range saturate.
    pub fn from_millis(ms: u64) -> Self {
        Timestamp(ms.min(U48_MAX))
    }

    pub fn millis(&self) -> u64 {
        self.0
    }
}

impl BinaryMarshal for Timestamp {
    fn marshal_binary(&self) -> Vec<u8> {
        encode_u48(self.0).to_vec()
    }

    fn unmarshal_binary_data(data: &[u8]) -> DecodeResult<'_, Self> {
        let (ms, rest) = decode_u48(data)?;
        Ok((Timestamp(ms), rest))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match DateTime::<Utc>::from_timestamp_millis(self.0 as i64) {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{}ms", self.0),
        }
    }
}
