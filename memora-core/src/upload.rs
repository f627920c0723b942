use crate::ports::{FileStore, ProgressFn, UploadDestination};
use crate::{CoreError, LocalFile, UploadResult};
use parking_lot::Mutex;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

pub const IMAGE_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_PREFIX: &str = "uploads";
pub const STUDY_SET_PREFIX: &str = "images/studysets";
pub const CARD_PREFIX: &str = "images/cards";

const SNIFF_LEN: usize = 8192;
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadPolicy {
    pub prefix: String,
    /// Empty means any content type.
    pub allowed_content_types: Vec<String>,
    /// Zero means no ceiling.
    pub max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            allowed_content_types: Vec::new(),
            max_bytes: 0,
        }
    }
}

impl UploadPolicy {
    pub fn images(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            allowed_content_types: IMAGE_CONTENT_TYPES.iter().map(|s| s.to_string()).collect(),
            max_bytes: MAX_IMAGE_BYTES,
        }
    }

    pub fn validate(&self, file: &LocalFile) -> Result<(), CoreError> {
        if self.max_bytes > 0 && file.size > self.max_bytes {
            return Err(CoreError::invalid("file is too large"));
        }
        if !self.allowed_content_types.is_empty()
            && !self
                .allowed_content_types
                .iter()
                .any(|t| t == &file.content_type)
        {
            return Err(CoreError::invalid("unsupported file type"));
        }
        Ok(())
    }

    fn destination(&self) -> UploadDestination {
        UploadDestination {
            folder_path: self.prefix.clone(),
            filename: None,
        }
    }
}

impl LocalFile {
    /// Reads size from metadata and sniffs the content type from the leading bytes.
    pub fn probe(path: &Path) -> Result<Self, CoreError> {
        let meta = fs::metadata(path)
            .map_err(|e| CoreError::Storage(format!("{}: {e}", path.display())))?;
        if !meta.is_file() {
            return Err(CoreError::invalid(format!("{} is not a file", path.display())));
        }
        let mut head = Vec::with_capacity(SNIFF_LEN);
        fs::File::open(path)?
            .take(SNIFF_LEN as u64)
            .read_to_end(&mut head)?;
        let content_type = infer::get(&head)
            .map(|t| t.mime_type().to_string())
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            content_type,
            size: meta.len(),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadState {
    pub is_uploading: bool,
    pub progress: u8,
    pub error: Option<String>,
}

/// Validates files against a policy before handing them to a store, and tracks progress.
pub struct Uploader<S> {
    store: S,
    policy: UploadPolicy,
    state: Arc<Mutex<UploadState>>,
}

impl<S: FileStore> Uploader<S> {
    pub fn new(store: S, policy: UploadPolicy) -> Self {
        Self {
            store,
            policy,
            state: Arc::new(Mutex::new(UploadState::default())),
        }
    }

    pub fn state(&self) -> UploadState {
        self.state.lock().clone()
    }

    pub fn reset(&self) {
        *self.state.lock() = UploadState::default();
    }

    pub async fn upload(&self, file: &LocalFile) -> Result<UploadResult, CoreError> {
        if let Err(e) = self.policy.validate(file) {
            warn!(file = %file.file_name, error = %e, "upload rejected locally");
            let mut st = self.state.lock();
            st.progress = 0;
            st.error = Some(e.to_string());
            return Err(e);
        }

        *self.state.lock() = UploadState {
            is_uploading: true,
            progress: 0,
            error: None,
        };

        let tracker = Arc::clone(&self.state);
        let progress: ProgressFn = Arc::new(move |pct| {
            tracker.lock().progress = pct.min(100);
        });

        debug!(file = %file.file_name, bytes = file.size, prefix = %self.policy.prefix, "uploading");
        match self
            .store
            .upload(file, &self.policy.destination(), progress)
            .await
        {
            Ok(res) => {
                *self.state.lock() = UploadState {
                    is_uploading: false,
                    progress: 100,
                    error: None,
                };
                debug!(url = %res.public_url, "upload finished");
                Ok(res)
            }
            Err(e) => {
                warn!(file = %file.file_name, error = %e, "upload failed");
                *self.state.lock() = UploadState {
                    is_uploading: false,
                    progress: 0,
                    error: Some(e.to_string()),
                };
                Err(e)
            }
        }
    }

    pub async fn upload_path(&self, path: &Path) -> Result<UploadResult, CoreError> {
        let file = LocalFile::probe(path)?;
        self.upload(&file).await
    }

    /// Uploads one file at a time and returns the public URLs in input order.
    pub async fn upload_many(&self, paths: &[&Path]) -> Result<Vec<String>, CoreError> {
        let mut urls = Vec::with_capacity(paths.len());
        for p in paths {
            urls.push(self.upload_path(p).await?.public_url);
        }
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file(content_type: &str, size: u64) -> LocalFile {
        LocalFile {
            path: PathBuf::from("x"),
            file_name: "x".into(),
            content_type: content_type.into(),
            size,
        }
    }

    #[test]
    fn image_policy_rejects_large_and_foreign() {
        let p = UploadPolicy::images(CARD_PREFIX);
        assert!(p.validate(&file("image/png", 1024)).is_ok());
        assert!(p.validate(&file("image/png", MAX_IMAGE_BYTES + 1)).is_err());
        let err = p.validate(&file("application/pdf", 10)).unwrap_err();
        assert!(err.to_string().contains("unsupported file type"));
    }

    #[test]
    fn default_policy_accepts_anything() {
        let p = UploadPolicy::default();
        assert!(p.validate(&file("text/plain", u64::MAX)).is_ok());
    }

    #[test]
    fn probe_sniffs_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dot.png");
        let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
        bytes.extend_from_slice(&[0u8; 32]);
        fs::write(&path, &bytes).unwrap();

        let f = LocalFile::probe(&path).unwrap();
        assert_eq!(f.content_type, "image/png");
        assert_eq!(f.size, bytes.len() as u64);
        assert_eq!(f.file_name, "dot.png");
    }
}
