use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use spdlog::info;
use uuid::Uuid;

pub const MEDIA_URL_PREFIX: &str = "/media/";

/// Result of a successful upload. `key` is what `delete` takes back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedMedia {
    pub url: String,
    pub key: String,
}

pub trait MediaStorage: Send {
    fn upload(&self, file_name: &str, bytes: &[u8]) -> io::Result<UploadedMedia>;
    fn delete(&self, key: &str) -> io::Result<()>;
}

/// Keys are plain file names. Anything that could walk out of the media dir is refused.
pub fn validate_key(key: &str) -> io::Result<()> {
    let bad = key.is_empty()
        || key.starts_with('.')
        || key.contains('/')
        || key.contains('\\')
        || key.contains("..");
    if bad {
        return Err(io::Error::new(ErrorKind::InvalidInput, format!("Invalid media key '{}'", key)));
    }
    Ok(())
}

fn extension_of(file_name: &str) -> String {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        "bin".to_string()
    } else {
        ext
    }
}

pub struct LocalMediaStorage {
    media_dir: PathBuf,
}

impl LocalMediaStorage {
    pub fn new(media_dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(media_dir)?;
        Ok(LocalMediaStorage { media_dir: media_dir.to_path_buf() })
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    pub fn path_of(&self, key: &str) -> io::Result<PathBuf> {
        validate_key(key)?;
        Ok(self.media_dir.join(key))
    }
}

impl MediaStorage for LocalMediaStorage {
    fn upload(&self, file_name: &str, bytes: &[u8]) -> io::Result<UploadedMedia> {
        if bytes.is_empty() {
            return Err(io::Error::new(ErrorKind::InvalidInput, "Empty upload"));
        }
        let key = format!("{}.{}", Uuid::new_v4(), extension_of(file_name));
        fs::write(self.path_of(&key)?, bytes)?;
        info!("Stored upload {} as {} ({} bytes)", file_name, key, bytes.len());
        Ok(UploadedMedia {
            url: format!("{}{}", MEDIA_URL_PREFIX, key),
            key,
        })
    }

    fn delete(&self, key: &str) -> io::Result<()> {
        fs::remove_file(self.path_of(key)?)?;
        info!("Deleted media {}", key);
        Ok(())
    }
}

/// In-memory storage for tests. Records every call.
#[cfg(test)]
pub mod memory {
    use std::io;
    use std::io::ErrorKind;
    use std::sync::{Arc, Mutex};

    use super::{MediaStorage, UploadedMedia, MEDIA_URL_PREFIX};

    #[derive(Default, Clone)]
    pub struct MemoryMediaStorage {
        pub stored: Arc<Mutex<Vec<String>>>,
        pub deleted: Arc<Mutex<Vec<String>>>,
        pub fail_deletes: bool,
    }

    impl MediaStorage for MemoryMediaStorage {
        fn upload(&self, file_name: &str, _bytes: &[u8]) -> io::Result<UploadedMedia> {
            let mut stored = self.stored.lock().unwrap();
            let key = format!("{}-{}", stored.len(), file_name);
            stored.push(key.clone());
            Ok(UploadedMedia { url: format!("{}{}", MEDIA_URL_PREFIX, key), key })
        }

        fn delete(&self, key: &str) -> io::Result<()> {
            if self.fail_deletes {
                return Err(io::Error::new(ErrorKind::Other, "storage unavailable"));
            }
            self.deleted.lock().unwrap().push(key.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_media_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("folio-media-{}-{}", name, Uuid::new_v4()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_upload_and_delete() -> io::Result<()> {
        let dir = temp_media_dir("upload");
        let storage = LocalMediaStorage::new(&dir)?;

        let uploaded = storage.upload("Screen Shot.PNG", b"fake png")?;
        assert!(uploaded.key.ends_with(".png"));
        assert_eq!(uploaded.url, format!("/media/{}", uploaded.key));
        assert_eq!(fs::read(dir.join(&uploaded.key))?, b"fake png");

        storage.delete(&uploaded.key)?;
        assert!(!dir.join(&uploaded.key).exists());
        assert!(storage.delete(&uploaded.key).is_err());

        fs::remove_dir_all(&dir)
    }

    #[test]
    fn test_odd_extensions() {
        assert_eq!(extension_of("noext"), "bin");
        assert_eq!(extension_of("a.tar.gz"), "gz");
        assert_eq!(extension_of("x.ph p"), "bin");
    }

    #[test]
    fn test_rejects_path_keys() {
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("a/b.png").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("6f1c.png").is_ok());
    }

    #[test]
    fn test_empty_upload_is_refused() -> io::Result<()> {
        let dir = temp_media_dir("empty");
        let storage = LocalMediaStorage::new(&dir)?;
        assert_eq!(storage.upload("a.png", b"").unwrap_err().kind(), ErrorKind::InvalidInput);
        fs::remove_dir_all(&dir)
    }
}
