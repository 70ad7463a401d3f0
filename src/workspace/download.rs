use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Save-as side effect of a download.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Persists `data` under `name` and returns where it ended up.
    async fn save(&self, name: &str, data: Vec<u8>) -> Result<PathBuf>;
}

/// Writes downloads into a directory.
///
/// The payload lands in a hidden `.part` file first and is renamed into
/// place; the partial file never outlives the call.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl DownloadSink for DirectorySink {
    async fn save(&self, name: &str, data: Vec<u8>) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let target = self.dir.join(safe_file_name(name));
        let partial = TransientFile::new(self.dir.join(format!(".{}.part", Uuid::new_v4())));
        tokio::fs::write(partial.path(), &data)
            .await
            .context("Failed to write download")?;
        drop(data);

        tokio::fs::rename(partial.path(), &target)
            .await
            .with_context(|| format!("Failed to move download to {}", target.display()))?;
        partial.persisted();
        Ok(target)
    }
}

/// Removes its file on drop unless marked persisted.
struct TransientFile {
    path: PathBuf,
    keep: bool,
}

impl TransientFile {
    fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn persisted(mut self) {
        self.keep = true;
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        if !self.keep {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Base name only; server-supplied names must not escape the target dir.
pub fn safe_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match base {
        "" | "." | ".." => "download".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn names_are_reduced_to_base_name() {
        assert_eq!(safe_file_name("report.pdf"), "report.pdf");
        assert_eq!(safe_file_name("../../etc/passwd"), "passwd");
        assert_eq!(safe_file_name("C:\\tmp\\a.txt"), "a.txt");
        assert_eq!(safe_file_name(".."), "download");
        assert_eq!(safe_file_name("dir/"), "download");
    }

    #[tokio::test]
    async fn saves_under_name_without_leftovers() {
        let tmp = TempDir::new().unwrap();
        let sink = DirectorySink::new(tmp.path().join("downloads"));

        let path = sink.save("a.txt", b"hello".to_vec()).await.unwrap();
        assert_eq!(path, tmp.path().join("downloads/a.txt"));
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        assert_eq!(entries(&tmp.path().join("downloads")), ["a.txt"]);
    }

    #[tokio::test]
    async fn failed_rename_removes_partial_file() {
        let tmp = TempDir::new().unwrap();
        // A directory in the way makes the final rename fail.
        std::fs::create_dir_all(tmp.path().join("taken/inner")).unwrap();
        let sink = DirectorySink::new(tmp.path());

        assert!(sink.save("taken", b"x".to_vec()).await.is_err());
        assert_eq!(entries(tmp.path()), ["taken"]);
    }
}
