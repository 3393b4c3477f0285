use async_trait::async_trait;
use thiserror::Error;

mod data;
pub use data::*;

mod sqlite;
pub use sqlite::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    /// Maps a storage-level unique constraint violation to a conflict.
    /// The constraints are the real enforcement, pre-checks are just the friendly fast path.
    fn conflict_or_any(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(e) => match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => Ok(()),
                e => Err(e),
            },
        }
    }
}

/// Represents a type that can fetch and mutate bandstand data in a database
#[async_trait]
pub trait Database: Send + Sync + 'static {
    async fn list_users(&self) -> Result<Vec<UserData>>;
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData>;
    async fn user_by_email(&self, email: &str) -> Result<UserData>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;
    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData>;
    async fn delete_user(&self, user_id: PrimaryKey) -> Result<()>;
    async fn delete_all_users(&self) -> Result<()>;

    async fn session_by_token(&self, token: &str) -> Result<SessionData>;
    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    async fn delete_session_by_token(&self, token: &str) -> Result<()>;
    async fn clear_expired_sessions(&self) -> Result<()>;

    async fn list_bands(&self) -> Result<Vec<BandData>>;
    async fn band_by_id(&self, band_id: PrimaryKey) -> Result<BandData>;
    async fn band_by_name(&self, name: &str) -> Result<BandData>;
    async fn create_band(&self, new_band: NewBand) -> Result<BandData>;
    async fn update_band(&self, updated_band: UpdatedBand) -> Result<BandData>;
    /// Deletes a band along with its memberships and audio rows.
    /// Returns the removed audio rows so the caller can clean up backing files.
    async fn delete_band(&self, band_id: PrimaryKey) -> Result<Vec<AudioData>>;

    async fn create_membership(&self, new_membership: NewMembership) -> Result<()>;
    /// Deletes exactly the membership rows matching both keys
    async fn delete_membership(&self, user_id: PrimaryKey, band_id: PrimaryKey) -> Result<()>;
    async fn band_members(&self, band_id: PrimaryKey) -> Result<Vec<UserData>>;
    async fn bands_for_user(&self, user_id: PrimaryKey) -> Result<Vec<BandData>>;

    async fn audios_for_band(&self, band_id: PrimaryKey) -> Result<Vec<AudioData>>;
    async fn audio_by_id(&self, band_id: PrimaryKey, audio_id: PrimaryKey) -> Result<AudioData>;
    async fn create_audio(&self, new_audio: NewAudio) -> Result<AudioData>;
    async fn delete_audio(&self, audio_id: PrimaryKey) -> Result<()>;
}

#[derive(Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct UpdatedUser {
    pub id: PrimaryKey,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug)]
pub struct NewSession {
    pub token: String,
    pub user_id: PrimaryKey,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug)]
pub struct NewBand {
    pub name: String,
}

#[derive(Debug)]
pub struct UpdatedBand {
    pub id: PrimaryKey,
    pub name: Option<String>,
}

#[derive(Debug)]
pub struct NewMembership {
    pub user_id: PrimaryKey,
    pub band_id: PrimaryKey,
}

#[derive(Debug)]
pub struct NewAudio {
    pub name: String,
    pub system_name: String,
    pub band_id: PrimaryKey,
}
