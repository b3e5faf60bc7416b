use thiserror::Error;

/// Errors raised while decoding wire bytes.
///
/// Every decode path returns one of these instead of panicking, so a
/// malformed peer message is rejected without touching node state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The buffer ended before the field being read was complete.
    #[error("Truncated input: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput { needed: usize, remaining: usize },

    /// The bytes do not have the shape of the message being decoded.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// A field decoded fine but holds a value outside its legal range.
    #[error("Value {value} out of range for {field}")]
    OutOfRange { field: &'static str, value: u64 },
}
