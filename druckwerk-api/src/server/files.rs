use druckwerk_common::slug::MediaPath;
use std::{
    io,
    path::{Component, Path, PathBuf},
};
use tracing::debug;

/// Stores uploaded media under a root directory, addressed by the relative
/// paths the domain derives (`posts/<slug>/<stem>_<suffix>.<ext>`).
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn resolve(&self, path: &MediaPath) -> io::Result<PathBuf> {
        let relative = Path::new(path.get());
        let traversal = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)));
        if traversal {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Media path escapes the media root: {path}"),
            ));
        }

        Ok(self.root.join(relative))
    }

    pub async fn store(&self, path: &MediaPath, data: &[u8]) -> io::Result<()> {
        let target = self.resolve(path)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, data).await?;

        debug!(%path, bytes = data.len(), "Stored media file");
        Ok(())
    }

    /// Deletes the file if it exists; a missing file is not an error. An
    /// emptied parent directory is removed as well, best effort.
    pub async fn remove(&self, path: &MediaPath) -> io::Result<()> {
        let target = self.resolve(path)?;

        match tokio::fs::remove_file(&target).await {
            Ok(()) => debug!(%path, "Removed media file"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err),
        }

        if let Some(parent) = target.parent() {
            // Fails while the directory still has entries, which is fine.
            let _ = tokio::fs::remove_dir(parent).await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::server::files::FileStore;
    use druckwerk_common::slug::MediaPath;
    use std::path::PathBuf;

    #[test]
    fn rejects_traversal() {
        let store = FileStore::new(PathBuf::from("/tmp/media"));

        assert!(store.resolve(&MediaPath::new("../etc/passwd".into())).is_err());
        assert!(store.resolve(&MediaPath::new("/etc/passwd".into())).is_err());
        assert!(
            store
                .resolve(&MediaPath::new("posts/slug/file_00000001.png".into()))
                .is_ok()
        );
    }

    #[tokio::test]
    async fn store_remove_round_trip() {
        let root = std::env::temp_dir().join(format!("druckwerk-test-{}", std::process::id()));
        let store = FileStore::new(root.clone());
        let path = MediaPath::new("posts/test/file_00000001.bin".into());

        store.store(&path, b"contents").await.unwrap();
        assert_eq!(
            tokio::fs::read(root.join("posts/test/file_00000001.bin"))
                .await
                .unwrap(),
            b"contents"
        );

        store.remove(&path).await.unwrap();
        assert!(!root.join("posts/test/file_00000001.bin").exists());
        // Removing again is not an error.
        store.remove(&path).await.unwrap();

        let _ = tokio::fs::remove_dir_all(root).await;
    }
}
