use crate::config::UploadSettings;
use std::path::{Path, PathBuf};

/// Strip a client-supplied file name down to its final component
///
/// Browsers on Windows may send full paths, so both separators are handled.
/// Returns `None` for names that would not stay inside a directory.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = raw
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or("")
        .trim();

    match name {
        "" | "." | ".." => None,
        name if name.contains('\0') => None,
        name => Some(name.to_string()),
    }
}

/// Staging directory for uploaded documents
///
/// Every upload gets its own `<dir>/<uuid>/` subdirectory so that uploads
/// sharing a file name never touch each other. Files are kept under their
/// original name and never cleaned up.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    document_extension: String,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, document_extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            document_extension: document_extension.into().trim_start_matches('.').to_string(),
        }
    }

    pub fn from_settings(settings: &UploadSettings) -> Self {
        Self::new(settings.dir.clone(), settings.document_extension.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn document_extension(&self) -> &str {
        &self.document_extension
    }

    /// Create the staging directory if it does not exist yet
    pub async fn prepare(&self) -> std::io::Result<()> {
        if tokio::fs::try_exists(&self.dir).await? {
            return Ok(());
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        tracing::info!("Created uploads folder at: {}", self.dir.display());
        Ok(())
    }

    pub async fn is_ready(&self) -> bool {
        tokio::fs::metadata(&self.dir)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }

    /// Fresh path for an upload with the given client file name
    pub fn staging_path(&self, original_name: &str) -> PathBuf {
        let name = sanitize_file_name(original_name).unwrap_or_else(|| "upload".to_string());
        self.dir.join(uuid::Uuid::new_v4().to_string()).join(name)
    }

    /// Pick a staging path and create its per-upload directory
    pub async fn reserve(&self, original_name: &str) -> std::io::Result<PathBuf> {
        let path = self.staging_path(original_name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(path)
    }

    /// Remove a partially written upload and its per-upload directory
    pub async fn discard(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!("Failed to remove partial upload {}: {}", path.display(), e);
        }
        if let Some(parent) = path.parent().filter(|p| *p != self.dir.as_path()) {
            let _ = tokio::fs::remove_dir(parent).await;
        }
    }

    pub fn has_expected_extension(&self, file_name: &str) -> bool {
        Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(&self.document_extension))
            .unwrap_or(false)
    }
}
