use tempfile::TempDir;

use crate::error::Result;

/// Create an isolated key-material directory for one signature operation.
///
/// The directory is removed when the returned handle drops, on every exit
/// path including failure.
pub fn ephemeral_gpg_home() -> Result<TempDir> {
    let dir = tempfile::Builder::new().prefix("gpg-").tempdir()?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ephemeral_gpg_home_removed_on_drop() {
        let dir = ephemeral_gpg_home().unwrap();
        let path = dir.path().to_path_buf();
        assert!(path.exists());
        drop(dir);
        assert!(!path.exists());
    }
}
