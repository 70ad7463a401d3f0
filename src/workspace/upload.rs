use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

use super::error::WorkspaceError;
use super::guards;

/// A local file picked for upload, read fully into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = guess_mime_type(&name);
        Self { name, mime_type, data }
    }

    pub async fn read(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("{} has no usable file name", path.display()))?
            .to_string();
        let data = fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self::new(name, data))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// The pending selection of an upload control.
///
/// Survives failed uploads so the user can retry; cleared on success.
#[derive(Debug, Clone, Default)]
pub struct FileSelection {
    files: Vec<LocalFile>,
}

impl FileSelection {
    pub fn new(files: Vec<LocalFile>) -> Self {
        Self { files }
    }

    pub async fn from_paths(paths: &[PathBuf]) -> Result<Self> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            files.push(LocalFile::read(path).await?);
        }
        Ok(Self { files })
    }

    pub fn files(&self) -> &[LocalFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }
}

/// One multipart submission. Built per upload action and consumed by it.
#[derive(Debug, Clone)]
pub struct UploadBatch {
    files: Vec<LocalFile>,
}

impl UploadBatch {
    /// Fails with the 10-file validation error before any I/O happens.
    pub fn from_selection(selection: &FileSelection) -> Result<Self, WorkspaceError> {
        guards::check_batch_size(selection.len())?;
        Ok(Self {
            files: selection.files.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(LocalFile::size).sum()
    }

    pub fn names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn into_files(self) -> Vec<LocalFile> {
        self.files
    }
}

/// Guess MIME type from filename extension.
pub fn guess_mime_type(filename: &str) -> String {
    let ext = match filename.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => String::new(),
    };
    match ext.as_str() {
        "txt" | "log" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "html" | "htm" => "text/html",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn selection(n: usize) -> FileSelection {
        FileSelection::new(
            (0..n)
                .map(|i| LocalFile::new(format!("f{i}.txt"), vec![b'x'; i]))
                .collect(),
        )
    }

    #[test]
    fn mime_guessing() {
        assert_eq!(guess_mime_type("notes.TXT"), "text/plain");
        assert_eq!(guess_mime_type("data.json"), "application/json");
        assert_eq!(guess_mime_type("paper.pdf"), "application/pdf");
        assert_eq!(guess_mime_type("Makefile"), "application/octet-stream");
    }

    #[test]
    fn batch_respects_cap() {
        let batch = UploadBatch::from_selection(&selection(10)).unwrap();
        assert_eq!(batch.len(), 10);
        assert_eq!(batch.total_bytes(), 45);

        let err = UploadBatch::from_selection(&selection(11)).unwrap_err();
        assert_eq!(err.to_string(), "Maximum 10 files per upload");
    }

    #[tokio::test]
    async fn selection_reads_files_from_disk() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.json");
        let b = tmp.path().join("b.pdf");
        std::fs::write(&a, b"{}").unwrap();
        std::fs::write(&b, b"%PDF").unwrap();

        let mut selection = FileSelection::from_paths(&[a, b]).await.unwrap();
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.files()[0].name, "a.json");
        assert_eq!(selection.files()[0].mime_type, "application/json");
        assert_eq!(selection.files()[1].data, b"%PDF");

        selection.clear();
        assert!(selection.is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = FileSelection::from_paths(&[tmp.path().join("nope.txt")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
