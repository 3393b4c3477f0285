mod auth;
mod bands;
mod config;
mod db;
mod storage;
mod util;

use std::sync::Arc;

pub use auth::*;
pub use bands::*;
pub use config::*;
pub use db::*;
pub use storage::*;
pub use util::*;

/// The bandstand system, facilitating accounts, bands, memberships, and
/// audio attachments
pub struct Bandstand<Db> {
    pub auth: Auth<Db>,
    pub bands: BandLibrary<Db>,
}

impl<Db> Bandstand<Db>
where
    Db: Database,
{
    pub fn new(database: Db, storage: AudioStorage) -> Self {
        let database = Arc::new(database);

        Self {
            auth: Auth::new(&database),
            bands: BandLibrary::new(&database, storage),
        }
    }
}
