use anyhow::Result;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// On-disk storage for uploaded media (avatars, voice clips).
///
/// Files live at `{storage_dir}/{relative_path}` and are served back
/// under the `/uploads/` URL prefix by the server. Size and content-type
/// limits are the caller's responsibility; this layer only persists
/// bytes it is handed.
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Upload storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    fn file_path(&self, relative: &str) -> PathBuf {
        self.dir.join(relative)
    }

    /// Directory handed to the static-file service.
    pub fn root(&self) -> &PathBuf {
        &self.dir
    }

    /// Persist bytes at the given relative path, replacing any existing
    /// file (avatars overwrite in place). Returns the public URL.
    pub async fn store(&self, relative: &str, bytes: &[u8]) -> Result<String> {
        let path = self.file_path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;

        Ok(Self::public_url(relative))
    }

    pub fn public_url(relative: &str) -> String {
        format!("/uploads/{relative}")
    }
}
