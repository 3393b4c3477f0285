use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

/// Filesystem storage for uploaded audio, laid out as
/// `<root>/Uploads/{bandName}/Audio/{systemName}`.
///
/// Filenames are generated, never derived from user input, so a display
/// name can't become a path component.
pub struct AudioStorage {
    root: PathBuf,
}

impl AudioStorage {
    pub const EXTENSION: &'static str = "m4a";

    pub fn new<P>(root: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self { root: root.into() }
    }

    /// Writes the payload under a freshly generated opaque filename,
    /// returning that filename
    pub async fn store(&self, band_name: &str, bytes: &[u8]) -> io::Result<String> {
        let dir = self.band_dir(band_name);
        fs::create_dir_all(&dir).await?;

        let system_name = format!("{}.{}", Uuid::new_v4(), Self::EXTENSION);
        fs::write(dir.join(&system_name), bytes).await?;

        Ok(system_name)
    }

    pub async fn load(&self, band_name: &str, system_name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path_of(band_name, system_name)).await
    }

    pub async fn remove(&self, band_name: &str, system_name: &str) -> io::Result<()> {
        fs::remove_file(self.path_of(band_name, system_name)).await
    }

    /// Removes a band's entire upload directory, if it exists
    pub async fn remove_band_dir(&self, band_name: &str) -> io::Result<()> {
        let dir = self.root.join("Uploads").join(band_name);

        match fs::remove_dir_all(&dir).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            result => result,
        }
    }

    pub fn path_of(&self, band_name: &str, system_name: &str) -> PathBuf {
        self.band_dir(band_name).join(system_name)
    }

    fn band_dir(&self, band_name: &str) -> PathBuf {
        self.root.join("Uploads").join(band_name).join("Audio")
    }
}

/// Returns whether a band name is safe to use as a storage directory name
pub fn is_storable_name(name: &str) -> bool {
    let has_path_chars = name
        .chars()
        .any(|c| matches!(c, '/' | '\\' | '\0') || c.is_control());

    !name.is_empty() && name != "." && name != ".." && !has_path_chars
}

impl AsRef<Path> for AudioStorage {
    fn as_ref(&self) -> &Path {
        &self.root
    }
}
