use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::storage::PIC_URL_PATH;

/// Content-addressed local picture store.
///
/// Finished files live directly under the root, named by their content hash.
/// In-flight uploads are staged under unique temporary names in the same
/// directory so the final rename never crosses a filesystem boundary.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final on-disk location for a given content hash
    pub fn final_path(&self, hash: &str) -> PathBuf {
        self.root.join(hash)
    }

    /// Path under which a stored hash is served
    pub fn served_path(hash: &str) -> String {
        format!("{}/{}", PIC_URL_PATH, hash)
    }

    /// Open a uniquely named temporary file inside the store root.
    pub async fn stage(&self) -> Result<(fs::File, PathBuf)> {
        let path = self.root.join(format!("new-{}", Uuid::new_v4()));
        let file = fs::File::create(&path)
            .await
            .map_err(|e| AppError::Storage(format!("failed to stage upload: {}", e)))?;
        Ok((file, path))
    }

    /// Remove a staged temporary file. Failures are logged, not surfaced;
    /// the caller is already on an error path.
    pub async fn discard(&self, temp: &Path) {
        if let Err(e) = fs::remove_file(temp).await {
            tracing::warn!("failed to discard staged file {:?}: {}", temp, e);
        }
    }

    /// Atomically move a staged file to its content-addressed location and
    /// return the served path. The rename overwrites an existing file with
    /// the same hash; identical content makes that a no-op. On failure the
    /// temp file is removed before the error surfaces.
    pub async fn commit(&self, temp: &Path, hash: &str) -> Result<String> {
        let dst = self.final_path(hash);
        if let Err(e) = fs::rename(temp, &dst).await {
            self.discard(temp).await;
            return Err(AppError::Storage(format!(
                "failed to commit {} to the picture store: {}",
                hash, e
            )));
        }
        tracing::debug!("committed picture {}", hash);
        Ok(Self::served_path(hash))
    }

    /// Remove a committed file (metadata rollback path).
    pub async fn remove(&self, hash: &str) -> Result<()> {
        fs::remove_file(self.final_path(hash)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn commit_is_a_rename() {
        let scratch = testutil::scratch_dir();
        let store = LocalStore::new(scratch.join("pics")).unwrap();

        let (mut file, temp) = store.stage().await.unwrap();
        file.write_all(b"picture bytes").await.unwrap();
        file.flush().await.unwrap();
        drop(file);

        let served = store.commit(&temp, "cafe").await.unwrap();
        assert_eq!(served, "/static/pics/cafe");
        assert!(!temp.exists());
        assert_eq!(std::fs::read(store.final_path("cafe")).unwrap(), b"picture bytes");

        std::fs::remove_dir_all(&scratch).ok();
    }

    #[tokio::test]
    async fn commit_overwrites_identical_content() {
        let scratch = testutil::scratch_dir();
        let store = LocalStore::new(scratch.join("pics")).unwrap();

        for _ in 0..2 {
            let (mut file, temp) = store.stage().await.unwrap();
            file.write_all(b"same bytes").await.unwrap();
            file.flush().await.unwrap();
            drop(file);
            store.commit(&temp, "feed").await.unwrap();
        }

        assert_eq!(std::fs::read(store.final_path("feed")).unwrap(), b"same bytes");
        // only the committed file remains, no stray temps
        let entries = std::fs::read_dir(store.root()).unwrap().count();
        assert_eq!(entries, 1);

        std::fs::remove_dir_all(&scratch).ok();
    }
}
