use std::path::PathBuf;
use std::sync::Arc;

use log::{error, info};
use thiserror::Error;

use crate::{
    storage::is_storable_name, AudioData, AudioStorage, BandData, Database, DatabaseError,
    NewAudio, NewBand, NewMembership, PrimaryKey, UpdatedBand, UserData,
};

/// Bands, their memberships, and their audio attachments.
///
/// Audio rows and backing files are kept in lockstep here: uploads write
/// the file before the row exists, deletes remove the row before the file,
/// and either half failing is reported instead of swallowed.
pub struct BandLibrary<Db> {
    db: Arc<Db>,
    storage: AudioStorage,
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Db(#[from] DatabaseError),
    /// The band name would become a storage directory, so path-hostile names are refused
    #[error("{0:?} cannot be used as a band name")]
    UnusableBandName(String),
    #[error("audio storage failed at {path}: {source}")]
    Storage {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl<Db> BandLibrary<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>, storage: AudioStorage) -> Self {
        Self {
            db: db.clone(),
            storage,
        }
    }

    /// Creates a band and adds its creator as the first member
    pub async fn create_band(
        &self,
        name: String,
        creator_id: PrimaryKey,
    ) -> Result<BandData, LibraryError> {
        if !is_storable_name(&name) {
            return Err(LibraryError::UnusableBandName(name));
        }

        let band = self.db.create_band(NewBand { name }).await?;

        self.db
            .create_membership(NewMembership {
                user_id: creator_id,
                band_id: band.id,
            })
            .await?;

        Ok(band)
    }

    pub async fn all_bands(&self) -> Result<Vec<BandData>, LibraryError> {
        Ok(self.db.list_bands().await?)
    }

    pub async fn band_by_id(&self, band_id: PrimaryKey) -> Result<BandData, LibraryError> {
        Ok(self.db.band_by_id(band_id).await?)
    }

    pub async fn bands_for_user(
        &self,
        user_id: PrimaryKey,
    ) -> Result<Vec<BandData>, LibraryError> {
        Ok(self.db.bands_for_user(user_id).await?)
    }

    pub async fn members(&self, band_id: PrimaryKey) -> Result<Vec<UserData>, LibraryError> {
        Ok(self.db.band_members(band_id).await?)
    }

    /// Renames a band, moving its upload directory along with it
    pub async fn update_band(&self, updated_band: UpdatedBand) -> Result<BandData, LibraryError> {
        if let Some(name) = &updated_band.name {
            if !is_storable_name(name) {
                return Err(LibraryError::UnusableBandName(name.clone()));
            }
        }

        let band_id = updated_band.id;
        let old = self.db.band_by_id(band_id).await?;
        let band = self.db.update_band(updated_band).await?;

        // Stored files are keyed by band name, so they move with the rename
        if band.name != old.name {
            let from = self.storage.as_ref().join("Uploads").join(&old.name);
            let to = self.storage.as_ref().join("Uploads").join(&band.name);

            match tokio::fs::rename(&from, &to).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(LibraryError::Storage { path: from, source }),
            }
        }

        Ok(band)
    }

    /// Deletes a band, cascading to its memberships, audio rows, and audio files
    pub async fn delete_band(&self, band_id: PrimaryKey) -> Result<(), LibraryError> {
        let band = self.db.band_by_id(band_id).await?;
        let removed = self.db.delete_band(band_id).await?;

        info!(
            "Deleted band {:?} along with {} audio attachment(s)",
            band.name,
            removed.len()
        );

        self.storage
            .remove_band_dir(&band.name)
            .await
            .map_err(|source| LibraryError::Storage {
                path: self.storage.as_ref().join("Uploads").join(&band.name),
                source,
            })
    }

    /// Adds a user to a band
    pub async fn connect(
        &self,
        user_id: PrimaryKey,
        band_id: PrimaryKey,
    ) -> Result<(), LibraryError> {
        Ok(self
            .db
            .create_membership(NewMembership { user_id, band_id })
            .await?)
    }

    /// Removes a user from a band
    pub async fn disconnect(
        &self,
        user_id: PrimaryKey,
        band_id: PrimaryKey,
    ) -> Result<(), LibraryError> {
        Ok(self.db.delete_membership(user_id, band_id).await?)
    }

    pub async fn audios(&self, band_id: PrimaryKey) -> Result<Vec<AudioData>, LibraryError> {
        Ok(self.db.audios_for_band(band_id).await?)
    }

    /// Stores an uploaded payload and records it as an audio attachment.
    ///
    /// The file is written first, and the row is only created if the write
    /// succeeded. If recording fails afterwards, the file is removed again.
    pub async fn upload_audio(
        &self,
        band_id: PrimaryKey,
        name: String,
        bytes: &[u8],
    ) -> Result<AudioData, LibraryError> {
        let band = self.db.band_by_id(band_id).await?;

        let system_name =
            self.storage
                .store(&band.name, bytes)
                .await
                .map_err(|source| LibraryError::Storage {
                    path: self.storage.as_ref().join("Uploads").join(&band.name),
                    source,
                })?;

        let created = self
            .db
            .create_audio(NewAudio {
                name,
                system_name: system_name.clone(),
                band_id,
            })
            .await;

        match created {
            Ok(audio) => Ok(audio),
            Err(e) => {
                if let Err(cleanup) = self.storage.remove(&band.name, &system_name).await {
                    error!(
                        "Failed to remove {:?} after its row could not be created: {cleanup}",
                        self.storage.path_of(&band.name, &system_name)
                    );
                }

                Err(e.into())
            }
        }
    }

    /// Loads an audio attachment along with the stored bytes
    pub async fn audio_with_bytes(
        &self,
        band_id: PrimaryKey,
        audio_id: PrimaryKey,
    ) -> Result<(AudioData, Vec<u8>), LibraryError> {
        let band = self.db.band_by_id(band_id).await?;
        let audio = self.db.audio_by_id(band_id, audio_id).await?;

        let bytes = self
            .storage
            .load(&band.name, &audio.system_name)
            .await
            .map_err(|source| LibraryError::Storage {
                path: self.storage.path_of(&band.name, &audio.system_name),
                source,
            })?;

        Ok((audio, bytes))
    }

    /// Deletes an audio attachment, row first, then the backing file.
    /// A failed file removal is surfaced, since it would leak the file.
    pub async fn delete_audio(
        &self,
        band_id: PrimaryKey,
        audio_id: PrimaryKey,
    ) -> Result<(), LibraryError> {
        let band = self.db.band_by_id(band_id).await?;
        let audio = self.db.audio_by_id(band_id, audio_id).await?;

        self.db.delete_audio(audio.id).await?;

        self.storage
            .remove(&band.name, &audio.system_name)
            .await
            .map_err(|source| LibraryError::Storage {
                path: self.storage.path_of(&band.name, &audio.system_name),
                source,
            })
    }
}
