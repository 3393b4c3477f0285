use chrono::{DateTime, Utc};

/// The type used for primary keys in the database.
pub type PrimaryKey = i64;

/// A bandstand account
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserData {
    pub id: PrimaryKey,
    pub name: String,
    pub email: String,
    /// The argon2 hash, never the plaintext
    pub password: String,
}

/// Login session data for authentication
#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: PrimaryKey,
    /// The session token, or key if you will
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// The user that is logged in
    pub user: UserData,
}

/// A band of users
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BandData {
    pub id: PrimaryKey,
    /// Globally unique, also names the band's upload directory
    pub name: String,
}

/// An audio attachment belonging to a band
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AudioData {
    pub id: PrimaryKey,
    /// The display name supplied on upload
    pub name: String,
    /// The generated opaque filename on disk
    pub system_name: String,
    pub band_id: PrimaryKey,
}
