use std::path::Path;

use tracing::info;

use crate::config::Config;
use crate::error::NodeError;

/// Writes a default config to `path` unless one already exists.
pub fn ensure_config(path: &Path) -> Result<(), NodeError> {
    if path.exists() {
        return Ok(());
    }

    info!("Config not found, writing defaults to {}", path.display());

    let uuid = uuid::Uuid::new_v4().simple().to_string();
    let node_id = format!("node-{}", &uuid[..8]);

    let config = Config {
        keypair_path: format!("keys/{}.key", node_id),
        node_id,
        ..Config::default()
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    config.save_to_file(path)?;
    info!("Config written for {}", config.node_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node").join("config.json");

        ensure_config(&path).unwrap();
        let first = Config::load_from_file(&path).unwrap();
        assert!(first.node_id.starts_with("node-"));
        assert_eq!(first.node_id.len(), "node-".len() + 8);

        ensure_config(&path).unwrap();
        let second = Config::load_from_file(&path).unwrap();
        assert_eq!(first, second);
    }
}
