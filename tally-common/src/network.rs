use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The network a node is running on.
///
/// Each profile carries its own close-of-minute behaviour, so the set is
/// closed: a raw network number outside it is an error, never a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkProfile {
    Main,
    Test,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Unsupported network number {0}")]
pub struct NetworkProfileError(pub u8);

impl NetworkProfile {
    pub const MAIN: u8 = 0;
    pub const TEST: u8 = 1;
    pub const LOCAL: u8 = 2;

    /// Raw network number as exposed by node state.
    pub fn number(self) -> u8 {
        match self {
            NetworkProfile::Main => Self::MAIN,
            NetworkProfile::Test => Self::TEST,
            NetworkProfile::Local => Self::LOCAL,
        }
    }
}

impl TryFrom<u8> for NetworkProfile {
    type Error = NetworkProfileError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            Self::MAIN => Ok(NetworkProfile::Main),
            Self::TEST => Ok(NetworkProfile::Test),
            Self::LOCAL => Ok(NetworkProfile::Local),
            other => Err(NetworkProfileError(other)),
        }
    }
}

impl fmt::Display for NetworkProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NetworkProfile::Main => "main",
            NetworkProfile::Test => "test",
            NetworkProfile::Local => "local",
        };
        write!(f, "{}", s)
    }
}
