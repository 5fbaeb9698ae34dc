// src/storage/mod.rs
//! Document storage for generated artifacts: upload bytes, get a shareable link.

pub mod drive;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Cv,
    CoverLetter,
    InterviewPrep,
}

impl ArtifactKind {
    pub fn folder(self) -> &'static str {
        match self {
            ArtifactKind::Cv => "CVs",
            ArtifactKind::CoverLetter => "Cover_Letters",
            ArtifactKind::InterviewPrep => "Interview_Prep",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ArtifactKind::Cv => "CV",
            ArtifactKind::CoverLetter => "CL",
            ArtifactKind::InterviewPrep => "Prep",
        }
    }
}

pub const MARKDOWN_MIME: &str = "text/markdown";

/// `{Folder}/{YYYY-MM}/{Company}_{Role}_{Type}.md`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPath {
    pub folders: Vec<String>,
    pub filename: String,
}

impl ArtifactPath {
    pub fn new(kind: ArtifactKind, company: &str, role: &str, at: DateTime<Utc>) -> Self {
        Self {
            folders: vec![kind.folder().to_string(), at.format("%Y-%m").to_string()],
            filename: sanitize_filename(&format!("{company}_{role}_{}.md", kind.label())),
        }
    }

    pub fn display(&self) -> String {
        let mut parts = self.folders.clone();
        parts.push(self.filename.clone());
        parts.join("/")
    }
}

/// Characters invalid on common filesystems become `_`, as do spaces.
pub fn sanitize_filename(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        })
        .collect()
}

#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Store `bytes` at `path` and return a shareable URL. Uploading the same
    /// path again supersedes the earlier document.
    async fn upload(&self, bytes: Vec<u8>, path: &ArtifactPath, mime: &str) -> Result<String, StorageError>;

    fn storage_name(&self) -> &'static str;
}

/// In-memory storage for tests.
#[derive(Debug)]
pub struct MemoryStorage {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    failing: AtomicBool,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self {
            files: Mutex::new(BTreeMap::new()),
            failing: AtomicBool::new(false),
        }
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn paths(&self) -> Vec<String> {
        self.files
            .lock()
            .expect("storage mutex poisoned")
            .keys()
            .cloned()
            .collect()
    }

    pub fn content(&self, path: &str) -> Option<String> {
        self.files
            .lock()
            .expect("storage mutex poisoned")
            .get(path)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

#[async_trait]
impl DocumentStorage for MemoryStorage {
    async fn upload(&self, bytes: Vec<u8>, path: &ArtifactPath, _mime: &str) -> Result<String, StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Transport("memory storage switched off".into()));
        }
        let key = path.display();
        self.files
            .lock()
            .expect("storage mutex poisoned")
            .insert(key.clone(), bytes);
        Ok(format!("mem://{key}"))
    }

    fn storage_name(&self) -> &'static str {
        "memory"
    }
}

/// Writes artifacts under a local directory (dry runs, no Drive token).
#[derive(Debug, Clone)]
pub struct LocalDirStorage {
    root: PathBuf,
}

impl LocalDirStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DocumentStorage for LocalDirStorage {
    async fn upload(&self, bytes: Vec<u8>, path: &ArtifactPath, _mime: &str) -> Result<String, StorageError> {
        let mut dir = self.root.clone();
        for f in &path.folders {
            dir.push(sanitize_filename(f));
        }
        tokio::fs::create_dir_all(&dir).await?;
        let file = dir.join(&path.filename);
        tokio::fs::write(&file, &bytes).await?;
        let abs = tokio::fs::canonicalize(&file).await.unwrap_or(file);
        tracing::debug!(path = %abs.display(), "artifact written");
        Ok(format!("file://{}", abs.display()))
    }

    fn storage_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_convention() {
        let at: DateTime<Utc> = "2025-11-03T10:00:00Z".parse().unwrap();
        let p = ArtifactPath::new(ArtifactKind::Cv, "Acme Bank", "Quant/Risk Analyst?", at);
        assert_eq!(p.folders, vec!["CVs".to_string(), "2025-11".to_string()]);
        assert_eq!(p.filename, "Acme_Bank_Quant_Risk_Analyst__CV.md");
        assert_eq!(p.display(), "CVs/2025-11/Acme_Bank_Quant_Risk_Analyst__CV.md");
    }

    #[tokio::test]
    async fn memory_storage_overwrites_same_path() {
        let s = MemoryStorage::new();
        let at: DateTime<Utc> = "2025-11-03T10:00:00Z".parse().unwrap();
        let p = ArtifactPath::new(ArtifactKind::CoverLetter, "Acme", "Analyst", at);
        s.upload(b"one".to_vec(), &p, MARKDOWN_MIME).await.unwrap();
        let url = s.upload(b"two".to_vec(), &p, MARKDOWN_MIME).await.unwrap();
        assert_eq!(url, "mem://Cover_Letters/2025-11/Acme_Analyst_CL.md");
        assert_eq!(s.paths().len(), 1);
        assert_eq!(s.content(&p.display()).as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn local_dir_storage_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let s = LocalDirStorage::new(dir.path());
        let at: DateTime<Utc> = "2025-11-03T10:00:00Z".parse().unwrap();
        let p = ArtifactPath::new(ArtifactKind::InterviewPrep, "Acme", "Analyst", at);
        let url = s.upload(b"# Prep".to_vec(), &p, MARKDOWN_MIME).await.unwrap();
        assert!(url.starts_with("file://"));
        let written = dir.path().join("Interview_Prep/2025-11/Acme_Analyst_Prep.md");
        assert_eq!(std::fs::read_to_string(written).unwrap(), "# Prep");
    }
}
