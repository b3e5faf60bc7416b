pub mod auth;
pub mod codec;
pub mod crypto;
pub mod error;
pub mod network;
pub mod time;

pub use codec::BinaryMarshal;
pub use crypto::hash::Hash;
pub use crypto::signature::FullSignature;
pub use error::CodecError;
pub use network::NetworkProfile;
pub use time::Timestamp;
