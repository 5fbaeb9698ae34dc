// src/storage/drive.rs
//! Google Drive REST upload with a bearer access token.
//! Folders are resolved (or created) once per process and cached.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config::DriveSettings;
use crate::error::StorageError;
use crate::storage::{ArtifactPath, DocumentStorage};

const FILES_API: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_API: &str = "https://www.googleapis.com/upload/drive/v3/files";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileRef {
    id: String,
    web_view_link: Option<String>,
}

/// Drive query literals are single-quoted; quotes and backslashes need escaping.
fn quote(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Live (not trashed) items named `name` directly under `parent`.
fn child_query(name: &str, parent: &str, mime: Option<&str>) -> String {
    let mut q = format!("name='{}' and '{}' in parents and trashed=false", quote(name), quote(parent));
    if let Some(m) = mime {
        q.push_str(&format!(" and mimeType='{m}'"));
    }
    q
}

pub struct DriveStorage {
    http: reqwest::Client,
    settings: DriveSettings,
    /// (parent id, folder name) -> folder id
    folders: Mutex<HashMap<(String, String), String>>,
}

impl DriveStorage {
    pub fn new(settings: DriveSettings) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            settings,
            folders: Mutex::new(HashMap::new()),
        }
    }

    fn root(&self) -> String {
        if self.settings.root_folder_id.trim().is_empty() {
            "root".to_string()
        } else {
            self.settings.root_folder_id.clone()
        }
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, StorageError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(StorageError::Api {
            status: status.as_u16(),
            message,
        })
    }

    fn transport(e: reqwest::Error) -> StorageError {
        StorageError::Transport(e.to_string())
    }

    async fn folder_id(&self, parent: &str, name: &str) -> Result<String, StorageError> {
        let cache_key = (parent.to_string(), name.to_string());
        let cached = self
            .folders
            .lock()
            .expect("folder cache poisoned")
            .get(&cache_key)
            .cloned();
        if let Some(id) = cached {
            return Ok(id);
        }

        let id = match self.find_child(parent, name, Some(FOLDER_MIME)).await? {
            Some(id) => id,
            None => {
                let body = json!({"name": name, "mimeType": FOLDER_MIME, "parents": [parent]});
                let resp = self
                    .http
                    .post(FILES_API)
                    .bearer_auth(&self.settings.access_token)
                    .query(&[("fields", "id")])
                    .json(&body)
                    .send()
                    .await
                    .map_err(Self::transport)?;
                let created: FileRef = Self::check(resp).await?.json().await.map_err(Self::transport)?;
                tracing::info!(folder = name, "created drive folder");
                created.id
            }
        };
        self.folders
            .lock()
            .expect("folder cache poisoned")
            .insert(cache_key, id.clone());
        Ok(id)
    }

    async fn find_child(&self, parent: &str, name: &str, mime: Option<&str>) -> Result<Option<String>, StorageError> {
        let q = child_query(name, parent, mime);
        let resp = self
            .http
            .get(FILES_API)
            .bearer_auth(&self.settings.access_token)
            .query(&[("q", q.as_str()), ("fields", "files(id)")])
            .send()
            .await
            .map_err(Self::transport)?;
        let list: FileList = Self::check(resp).await?.json().await.map_err(Self::transport)?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }
}

#[async_trait]
impl DocumentStorage for DriveStorage {
    async fn upload(&self, bytes: Vec<u8>, path: &ArtifactPath, mime: &str) -> Result<String, StorageError> {
        if !self.settings.is_configured() {
            return Err(StorageError::NotConfigured("GOOGLE_DRIVE_ACCESS_TOKEN".into()));
        }
        let mut parent = self.root();
        for name in &path.folders {
            parent = self.folder_id(&parent, name).await?;
        }

        // 1) reuse the file at this path, else create its metadata
        let file_id = match self.find_child(&parent, &path.filename, None).await? {
            Some(id) => {
                tracing::debug!(file = %path.display(), "replacing existing drive file");
                id
            }
            None => {
                let meta = json!({"name": path.filename, "parents": [parent], "mimeType": mime});
                let resp = self
                    .http
                    .post(FILES_API)
                    .bearer_auth(&self.settings.access_token)
                    .query(&[("fields", "id")])
                    .json(&meta)
                    .send()
                    .await
                    .map_err(Self::transport)?;
                let file: FileRef = Self::check(resp).await?.json().await.map_err(Self::transport)?;
                file.id
            }
        };

        // 2) content
        let resp = self
            .http
            .patch(format!("{UPLOAD_API}/{file_id}"))
            .bearer_auth(&self.settings.access_token)
            .query(&[("uploadType", "media"), ("fields", "id,webViewLink")])
            .header(reqwest::header::CONTENT_TYPE, mime)
            .body(bytes)
            .send()
            .await
            .map_err(Self::transport)?;
        let uploaded: FileRef = Self::check(resp).await?.json().await.map_err(Self::transport)?;

        // 3) anyone with the link can read
        let resp = self
            .http
            .post(format!("{FILES_API}/{file_id}/permissions"))
            .bearer_auth(&self.settings.access_token)
            .json(&json!({"type": "anyone", "role": "reader"}))
            .send()
            .await
            .map_err(Self::transport)?;
        if let Err(e) = Self::check(resp).await {
            tracing::warn!(file = %path.display(), error = %e, "could not share drive file");
        }

        tracing::info!(file = %path.display(), "uploaded artifact to drive");
        Ok(uploaded
            .web_view_link
            .unwrap_or_else(|| format!("https://drive.google.com/file/d/{file_id}/view")))
    }

    fn storage_name(&self) -> &'static str {
        "drive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_literals_are_escaped() {
        assert_eq!(quote("O'Reilly"), "O\\'Reilly");
        assert_eq!(quote(r"a\b"), r"a\\b");
    }

    #[test]
    fn child_query_scopes_name_parent_and_type() {
        assert_eq!(
            child_query("Acme_Analyst_CV.md", "folder1", None),
            "name='Acme_Analyst_CV.md' and 'folder1' in parents and trashed=false"
        );
        assert_eq!(
            child_query("2025-11", "root", Some(FOLDER_MIME)),
            "name='2025-11' and 'root' in parents and trashed=false \
             and mimeType='application/vnd.google-apps.folder'"
        );
    }

    #[tokio::test]
    async fn missing_token_is_not_configured() {
        let d = DriveStorage::new(DriveSettings::default());
        let p = ArtifactPath {
            folders: vec![],
            filename: "x.md".into(),
        };
        assert!(matches!(
            d.upload(vec![], &p, "text/markdown").await,
            Err(StorageError::NotConfigured(_))
        ));
    }
}
