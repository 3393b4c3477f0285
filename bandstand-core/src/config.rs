use std::env;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 8080;

/// Startup configuration, read once from the environment and passed
/// explicitly to whatever needs it
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub uploads_dir: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        let database_url = env::var("BANDSTAND_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://bandstand.db".to_string());

        let uploads_dir =
            env::var("BANDSTAND_UPLOADS_DIR").unwrap_or_else(|_| "Public".to_string());

        let port = env::var("BANDSTAND_SERVER_PORT")
            .map(|x| x.parse::<u16>().expect("Port must be a number"))
            .unwrap_or(DEFAULT_PORT);

        Self {
            database_url,
            uploads_dir,
            port,
        }
    }
}
