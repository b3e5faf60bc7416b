//! codec.rs
//!
//! Big-endian, field-ordered binary primitives shared by every wire type.
//!
//! Decoders take a byte slice and return the decoded value together with
//! the unconsumed rest, so a message decoder threads a single cursor
//! through its fields in wire order. Nothing here indexes a slice without
//! checking its length first.

use crate::error::CodecError;

/// Decoded value plus the bytes left over after it.
pub type DecodeResult<'a, T> = Result<(T, &'a [u8]), CodecError>;

/// Largest value representable in the 6-byte integer encoding.
pub const U48_MAX: u64 = (1 << 48) - 1;

/// A type with a fixed, self-delimiting binary encoding.
pub trait BinaryMarshal: Sized {
    fn marshal_binary(&self) -> Vec<u8>;

    fn unmarshal_binary_data(data: &[u8]) -> DecodeResult<'_, Self>;

    /// Decodes a value that must span the whole buffer.
    fn unmarshal_binary(data: &[u8]) -> Result<Self, CodecError> {
        let (value, rest) = Self::unmarshal_binary_data(data)?;
        if !rest.is_empty() {
            return Err(CodecError::MalformedMessage(format!(
                "{} trailing bytes",
                rest.len()
            )));
        }
        Ok(value)
    }
}

/// Splits `n` bytes off the front of `data`.
pub fn take(data: &[u8], n: usize) -> DecodeResult<'_, &[u8]> {
    if data.len() < n {
        return Err(CodecError::TruncatedInput {
            needed: n,
            remaining: data.len(),
        });
    }
    Ok(data.split_at(n))
}

/// Copies exactly `N` bytes off the front of `data`.
pub fn take_array<const N: usize>(data: &[u8]) -> DecodeResult<'_, [u8; N]> {
    let (bytes, rest) = take(data, N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    Ok((out, rest))
}

pub fn decode_u8(data: &[u8]) -> DecodeResult<'_, u8> {
    let ([b], rest) = take_array::<1>(data)?;
    Ok((b, rest))
}

pub fn encode_fixed32(v: u32) -> [u8; 4] {
    v.to_be_bytes()
}

pub fn decode_fixed32(data: &[u8]) -> DecodeResult<'_, u32> {
    let (bytes, rest) = take_array::<4>(data)?;
    Ok((u32::from_be_bytes(bytes), rest))
}

/// Encodes the low 48 bits of `v`; callers keep values within `U48_MAX`.
pub fn encode_u48(v: u64) -> [u8; 6] {
    let full = v.to_be_bytes();
    let mut out = [0u8; 6];
    out.copy_from_slice(&full[2..]);
    out
}

pub fn decode_u48(data: &[u8]) -> DecodeResult<'_, u64> {
    let (bytes, rest) = take_array::<6>(data)?;
    let mut full = [0u8; 8];
    full[2..].copy_from_slice(&bytes);
    Ok((u64::from_be_bytes(full), rest))
}
