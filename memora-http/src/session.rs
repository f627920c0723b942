use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use memora_core::CoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::task;

const FILE_VERSION: u32 = 1;
const TOKEN_FILE: &str = "session.json";

/// `session.json` in the platform data dir, or in the working dir when there is no home.
fn default_token_file() -> PathBuf {
    let root = match ProjectDirs::from("vn", "memora", "MemoraAdmin") {
        Some(pd) => pd.data_dir().to_path_buf(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    root.join(TOKEN_FILE)
}

#[derive(Clone, Serialize, Deserialize)]
struct SessionImage {
    version: u32,
    saved_at: DateTime<Utc>,
    token: String,
}

/// Bearer token kept on disk between runs.
#[derive(Clone, Debug)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn open_default() -> Self {
        Self::at(default_token_file())
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Option<String>, CoreError> {
        let path = self.path.clone();
        task::spawn_blocking(move || read_image(&path))
            .await
            .map_err(|e| CoreError::Storage(e.to_string()))?
            .map(|img| img.map(|i| i.token))
    }

    pub async fn save(&self, token: &str) -> Result<(), CoreError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CoreError::invalid("token is empty"));
        }
        let img = SessionImage {
            version: FILE_VERSION,
            saved_at: Utc::now(),
            token: token.to_string(),
        };
        let path = self.path.clone();
        task::spawn_blocking(move || write_atomic(&path, &img))
            .await
            .map_err(|e| CoreError::Storage(e.to_string()))?
            .map_err(CoreError::from)
    }

    /// Returns whether a token was present.
    pub async fn clear(&self) -> Result<bool, CoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn read_image(path: &Path) -> Result<Option<SessionImage>, CoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let buf = fs::read_to_string(path)?;
    let img: SessionImage = serde_json::from_str(&buf)
        .map_err(|e| CoreError::Storage(format!("{}: {e}", path.display())))?;
    if img.version != FILE_VERSION {
        return Err(CoreError::Storage(format!(
            "unsupported session file version {}",
            img.version
        )));
    }
    Ok(Some(img))
}

fn write_atomic(path: &Path, img: &SessionImage) -> Result<(), std::io::Error> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let json = serde_json::to_vec_pretty(img)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&json)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::at(dir.path().join("nested").join("session.json"));

        assert_eq!(store.load().await.unwrap(), None);
        store.save("  abc.def  ").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("abc.def"));

        store.save("second").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("second"));

        assert!(store.clear().await.unwrap());
        assert!(!store.clear().await.unwrap());
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::at(dir.path().join("session.json"));
        assert!(store.save("   ").await.is_err());
        assert!(!store.path().exists());
    }
}
