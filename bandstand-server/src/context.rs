use std::sync::Arc;

use axum::extract::FromRef;
use bandstand_core::{Bandstand, SqliteDatabase};

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub bandstand: Arc<Bandstand<SqliteDatabase>>,
}
