//! Key generation command

use anyhow::{bail, Context, Result};
use std::path::Path;

use subnet_cli::{constants::MAINNET_ID, SoftKey};

use super::{print_error, print_success};

/// Run the create key command
pub fn run(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        print_error(&format!(
            "{} already exists. Pass --force to overwrite it.",
            path.display()
        ));
        bail!("Key file already exists");
    }

    // the file holds raw key material only, the network is picked at load time
    let key = SoftKey::generate(MAINNET_ID)?;
    key.save(path)
        .with_context(|| format!("Failed to write key to {}", path.display()))?;

    print_success(&format!("Created private key at {}", path.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use subnet_cli::constants::LOCAL_ID;
    use tempfile::tempdir;

    #[test]
    fn test_creates_loadable_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("key.pk");

        run(&path, false).unwrap();
        let key = SoftKey::load(LOCAL_ID, &path).unwrap();
        assert!(key.p_addresses()[0].starts_with("P-local1"));
    }

    #[test]
    fn test_refuses_overwrite_without_force() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("key.pk");

        run(&path, false).unwrap();
        let before = std::fs::read(&path).unwrap();
        assert!(run(&path, false).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), before);

        run(&path, true).unwrap();
        assert_ne!(std::fs::read(&path).unwrap(), before);
    }
}
