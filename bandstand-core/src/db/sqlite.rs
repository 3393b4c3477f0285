use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    query, query_as,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError, SqlitePool,
};

use crate::{
    AudioData, BandData, Database, DatabaseError, DatabaseResult, IntoDatabaseError, NewAudio,
    NewBand, NewMembership, NewSession, NewUser, PrimaryKey, Result, SessionData, UpdatedBand,
    UpdatedUser, UserData,
};

/// A SQLite database implementation for bandstand
pub struct SqliteDatabase {
    pool: SqlitePool,
}

/// A session row joined with its user
#[derive(sqlx::FromRow)]
struct SessionRow {
    id: PrimaryKey,
    token: String,
    expires_at: DateTime<Utc>,
    user_id: PrimaryKey,
    name: String,
    email: String,
    password: String,
}

impl SqliteDatabase {
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| e.any())?
            .create_if_missing(true)
            .foreign_keys(true);

        // In-memory databases exist per connection, so the pool must not open a second one
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| e.any())?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn list_users(&self) -> Result<Vec<UserData>> {
        query_as::<_, UserData>("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        query_as::<_, UserData>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "id"))
    }

    async fn user_by_email(&self, email: &str) -> Result<UserData> {
        query_as::<_, UserData>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "email"))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        self.user_by_email(&new_user.email)
            .await
            .conflict_or_ok("user", "email", &new_user.email)?;

        query_as::<_, UserData>(
            "INSERT INTO users (name, email, password) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.conflict_or_any("user", "email", &new_user.email))
    }

    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData> {
        let user = self.user_by_id(updated_user.id).await?;
        let email = updated_user.email.unwrap_or(user.email);

        query("UPDATE users SET name = ?, email = ? WHERE id = ?")
            .bind(updated_user.name.unwrap_or(user.name))
            .bind(&email)
            .bind(updated_user.id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.conflict_or_any("user", "email", &email))?;

        self.user_by_id(updated_user.id).await
    }

    async fn delete_user(&self, user_id: PrimaryKey) -> Result<()> {
        // Ensure user exists
        let _ = self.user_by_id(user_id).await?;

        query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn delete_all_users(&self) -> Result<()> {
        query("DELETE FROM users")
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        let row = query_as::<_, SessionRow>(
            "SELECT
                sessions.id,
                sessions.token,
                sessions.expires_at,
                users.id AS user_id,
                users.name,
                users.email,
                users.password
            FROM sessions
                INNER JOIN users ON sessions.user_id = users.id
            WHERE token = ? AND expires_at > ?",
        )
        .bind(token)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("session", "token"))?;

        Ok(SessionData {
            id: row.id,
            token: row.token,
            expires_at: row.expires_at,
            user: UserData {
                id: row.user_id,
                name: row.name,
                email: row.email,
                password: row.password,
            },
        })
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        self.session_by_token(&new_session.token)
            .await
            .conflict_or_ok("session", "token", &new_session.token)?;

        query("INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(&new_session.token)
            .bind(new_session.user_id)
            .bind(new_session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| e.conflict_or_any("session", "token", &new_session.token))?;

        self.session_by_token(&new_session.token).await
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        // Ensure session exists
        let _ = self.session_by_token(token).await?;

        query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn list_bands(&self) -> Result<Vec<BandData>> {
        query_as::<_, BandData>("SELECT * FROM bands ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn band_by_id(&self, band_id: PrimaryKey) -> Result<BandData> {
        query_as::<_, BandData>("SELECT * FROM bands WHERE id = ?")
            .bind(band_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("band", "id"))
    }

    async fn band_by_name(&self, name: &str) -> Result<BandData> {
        query_as::<_, BandData>("SELECT * FROM bands WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("band", "name"))
    }

    async fn create_band(&self, new_band: NewBand) -> Result<BandData> {
        self.band_by_name(&new_band.name)
            .await
            .conflict_or_ok("band", "name", &new_band.name)?;

        query_as::<_, BandData>("INSERT INTO bands (name) VALUES (?) RETURNING *")
            .bind(&new_band.name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.conflict_or_any("band", "name", &new_band.name))
    }

    async fn update_band(&self, updated_band: UpdatedBand) -> Result<BandData> {
        let band = self.band_by_id(updated_band.id).await?;
        let name = updated_band.name.unwrap_or(band.name);

        query("UPDATE bands SET name = ? WHERE id = ?")
            .bind(&name)
            .bind(updated_band.id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.conflict_or_any("band", "name", &name))?;

        self.band_by_id(updated_band.id).await
    }

    async fn delete_band(&self, band_id: PrimaryKey) -> Result<Vec<AudioData>> {
        // Ensure band exists
        let _ = self.band_by_id(band_id).await?;
        let audios = self.audios_for_band(band_id).await?;

        // Memberships and audio rows go with the band via ON DELETE CASCADE
        query("DELETE FROM bands WHERE id = ?")
            .bind(band_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        Ok(audios)
    }

    async fn create_membership(&self, new_membership: NewMembership) -> Result<()> {
        let value = format!("{}:{}", new_membership.user_id, new_membership.band_id);

        // Ensure the user isn't a member of this band already
        query("SELECT id FROM user_bands WHERE user_id = ? AND band_id = ?")
            .bind(new_membership.user_id)
            .bind(new_membership.band_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("membership", "user:band"))
            .map(|_| ())
            .conflict_or_ok("membership", "user:band", &value)?;

        query("INSERT INTO user_bands (user_id, band_id) VALUES (?, ?)")
            .bind(new_membership.user_id)
            .bind(new_membership.band_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.conflict_or_any("membership", "user:band", &value))
            .map(|_| ())
    }

    async fn delete_membership(&self, user_id: PrimaryKey, band_id: PrimaryKey) -> Result<()> {
        // Targeting both keys jointly, so an unrelated pair is never deleted
        let row: (PrimaryKey,) =
            query_as("SELECT id FROM user_bands WHERE user_id = ? AND band_id = ?")
                .bind(user_id)
                .bind(band_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| e.not_found_or("membership", "user_id:band_id"))?;

        query("DELETE FROM user_bands WHERE id = ?")
            .bind(row.0)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn band_members(&self, band_id: PrimaryKey) -> Result<Vec<UserData>> {
        query_as::<_, UserData>(
            "SELECT
                users.id,
                users.name,
                users.email,
                users.password
            FROM user_bands
                INNER JOIN users ON user_bands.user_id = users.id
            WHERE user_bands.band_id = ?",
        )
        .bind(band_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn bands_for_user(&self, user_id: PrimaryKey) -> Result<Vec<BandData>> {
        query_as::<_, BandData>(
            "SELECT
                bands.id,
                bands.name
            FROM user_bands
                INNER JOIN bands ON user_bands.band_id = bands.id
            WHERE user_bands.user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn audios_for_band(&self, band_id: PrimaryKey) -> Result<Vec<AudioData>> {
        query_as::<_, AudioData>("SELECT * FROM audios WHERE band_id = ? ORDER BY id")
            .bind(band_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn audio_by_id(&self, band_id: PrimaryKey, audio_id: PrimaryKey) -> Result<AudioData> {
        query_as::<_, AudioData>("SELECT * FROM audios WHERE id = ? AND band_id = ?")
            .bind(audio_id)
            .bind(band_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("audio", "id"))
    }

    async fn create_audio(&self, new_audio: NewAudio) -> Result<AudioData> {
        // The band must be alive at creation time, enforced by the foreign key as well
        let _ = self.band_by_id(new_audio.band_id).await?;

        query_as::<_, AudioData>(
            "INSERT INTO audios (name, system_name, band_id) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(&new_audio.name)
        .bind(&new_audio.system_name)
        .bind(new_audio.band_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn delete_audio(&self, audio_id: PrimaryKey) -> Result<()> {
        query("SELECT id FROM audios WHERE id = ?")
            .bind(audio_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("audio", "id"))?;

        query("DELETE FROM audios WHERE id = ?")
            .bind(audio_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }

    fn conflict_or_any(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> DatabaseError {
        let is_unique_violation = self
            .as_database_error()
            .map(|e| e.is_unique_violation())
            .unwrap_or_default();

        if is_unique_violation {
            DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }
        } else {
            Self::any(self)
        }
    }
}
