use std::fs;
use std::path::Path;

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use tally_common::auth::ed25519::Ed25519Authenticator;
use tracing::info;

use crate::error::NodeError;

/// Loads the node's signing key from `path`, generating and persisting a
/// fresh one if the file does not exist.
///
/// The file holds the raw 32-byte Ed25519 seed.
pub fn load_or_generate_signing_key(path: &Path) -> Result<Ed25519Authenticator, NodeError> {
    if path.exists() {
        let bytes = fs::read(path)?;
        return Ok(Ed25519Authenticator::from_bytes(&bytes)?);
    }

    let auth = Ed25519Authenticator::new(SigningKey::generate(&mut OsRng));
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, auth.secret_bytes())?;
    info!("Generated new signing key at {}", path.display());
    Ok(auth)
}
