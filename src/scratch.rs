//! Scoped temp artifacts for a single request.
//!
//! Downloads and extracted frames live under uniquely named paths and are
//! removed on drop, so every exit path (success, early return, error) cleans
//! up after itself.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Root for all of this service's scratch space.
pub fn scratch_root() -> PathBuf {
    std::env::temp_dir().join("media-sentinel")
}

/// A uniquely named file path removed when the guard drops.
///
/// The file itself is created by whoever writes to the path; a guard over a
/// never-created file drops silently.
#[derive(Debug)]
pub struct TempMedia {
    path: PathBuf,
}

impl TempMedia {
    pub fn create(dir: &Path, ext: &str) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.{}", Uuid::new_v4(), ext));
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempMedia {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// A uniquely named directory removed recursively when the guard drops.
#[derive(Debug)]
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn create(parent: &Path) -> io::Result<Self> {
        let path = parent.join(Uuid::new_v4().to_string());
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_media_is_removed_on_drop() {
        let dir = scratch_root().join("test-media");
        let path = {
            let media = TempMedia::create(&dir, "bin").unwrap();
            fs::write(media.path(), b"payload").unwrap();
            assert!(media.path().exists());
            media.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn never_written_temp_media_drops_silently() {
        let dir = scratch_root().join("test-media");
        let media = TempMedia::create(&dir, "mp4").unwrap();
        assert!(!media.path().exists());
        drop(media);
    }

    #[test]
    fn temp_dir_is_removed_recursively() {
        let parent = scratch_root().join("test-dirs");
        fs::create_dir_all(&parent).unwrap();
        let path = {
            let dir = TempDir::create(&parent).unwrap();
            fs::write(dir.path().join("frame_0001.png"), b"x").unwrap();
            dir.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
