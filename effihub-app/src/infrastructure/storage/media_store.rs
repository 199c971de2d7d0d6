use effihub_errors::AppError;
use std::path::{Component, Path, PathBuf};

use crate::application::BlobStore;

/// Filesystem-backed blob storage for banners, logos and screenshots: bytes land under the media root and are
/// served back under the public base URL by the static-file route.
#[derive(Clone)]
pub struct LocalMediaStore {
    root: PathBuf,
    public_base: String,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(path);
        // Uploads never get to name an absolute or parent path.
        let traversal = relative.components().any(|component| {
            !matches!(component, Component::Normal(_))
        });
        if traversal || path.is_empty() {
            return Err(AppError::Storage(format!("invalid blob path: {path}")));
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for LocalMediaStore {
    async fn store(
        &self,
        path: &str,
        _content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, AppError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| AppError::Storage(err.to_string()))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|err| AppError::Storage(err.to_string()))?;

        Ok(format!("{}/{}", self.public_base, path))
    }
}
