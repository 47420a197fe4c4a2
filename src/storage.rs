use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const AVATAR_DIR: &str = "avatars";

/// Filesystem-backed object store for profile pictures. Objects land under
/// `<root>/avatars/` and are addressed by a public URL derived from the
/// configured base; serving the directory is the embedding application's job.
#[derive(Clone, Debug)]
pub struct AvatarStorage {
    root: PathBuf,
    public_base: String,
}

impl AvatarStorage {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        let public_base = public_base.into().trim_end_matches('/').to_string();
        Self {
            root: root.into(),
            public_base,
        }
    }

    /// Write an avatar blob and return its public URL. The object key is
    /// derived from the owner id, the current timestamp and the file
    /// extension, so successive uploads never overwrite each other.
    pub fn store(&self, user_id: &str, bytes: &[u8], extension: &str) -> Result<String> {
        if bytes.is_empty() {
            return Err(Error::storage("Refusing to store an empty avatar"));
        }
        let extension = normalize_extension(extension);
        let file_name = format!(
            "{}_{}.{}",
            user_id,
            chrono::Utc::now().timestamp_millis(),
            extension
        );
        let dir = self.root.join(AVATAR_DIR);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(&file_name), bytes)?;
        Ok(format!("{}/{}/{}", self.public_base, AVATAR_DIR, file_name))
    }

    /// Store an avatar from a local file, inferring the extension from its
    /// path.
    pub fn store_from_path(&self, user_id: &str, path: &Path) -> Result<String> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("jpg");
        let bytes = fs::read(path)?;
        self.store(user_id, &bytes, extension)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn normalize_extension(extension: &str) -> String {
    let cleaned = extension.trim_start_matches('.').to_ascii_lowercase();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_alphanumeric()) {
        "jpg".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_writes_under_avatar_dir_and_builds_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let storage = AvatarStorage::new(dir.path(), "http://localhost:8080/static/");

        let url = storage.store("user-1", b"fake-png", "PNG").unwrap();

        assert!(url.starts_with("http://localhost:8080/static/avatars/user-1_"));
        assert!(url.ends_with(".png"));

        let file_name = url.rsplit('/').next().unwrap();
        let on_disk = dir.path().join("avatars").join(file_name);
        assert_eq!(fs::read(on_disk).unwrap(), b"fake-png");
    }

    #[test]
    fn store_from_path_infers_extension() {
        let dir = tempfile::tempdir().unwrap();
        let storage = AvatarStorage::new(dir.path(), "http://cdn.example.com");

        let source = dir.path().join("photo.jpeg");
        fs::write(&source, b"jpeg-bytes").unwrap();

        let url = storage.store_from_path("user-2", &source).unwrap();
        assert!(url.ends_with(".jpeg"));
    }

    #[test]
    fn odd_extensions_fall_back_to_jpg() {
        assert_eq!(normalize_extension(""), "jpg");
        assert_eq!(normalize_extension("../evil"), "jpg");
        assert_eq!(normalize_extension(".JPG"), "jpg");
        assert_eq!(normalize_extension("webp"), "webp");
    }

    #[test]
    fn empty_blob_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = AvatarStorage::new(dir.path(), "http://cdn.example.com");
        assert!(storage.store("user-3", b"", "png").is_err());
    }
}
