use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// File-backed bearer token storage used by `login` / `logout`.
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `None` when nothing (or only whitespace) is stored.
    pub async fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", self.path.display())),
        }
    }

    pub async fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create token directory")?;
        }
        fs::write(&self.path, token.trim())
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        restrict_permissions(&self.path).await
    }

    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .context("Failed to restrict token file permissions")
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn save_load_clear_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = TokenStore::new(tmp.path().join("nested/token"));

        assert_eq!(store.load().await.unwrap(), None);
        store.save("  abc.def.ghi\n").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("abc.def.ghi"));

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
        // Clearing twice is fine.
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn whitespace_only_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("token");
        std::fs::write(&path, "\n\n").unwrap();
        assert_eq!(TokenStore::new(path).load().await.unwrap(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn saved_token_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().unwrap();
        let store = TokenStore::new(tmp.path().join("token"));
        store.save("t").await.unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
