use std::sync::Arc;

use bandstand_core::{AudioStorage, Bandstand, Config, SqliteDatabase};
use bandstand_server::{init_logger, run_server, ServerContext};
use log::info;

#[tokio::main]
async fn main() {
    init_logger();

    let config = Config::from_env();

    info!("Connecting to database...");
    let database = SqliteDatabase::connect(&config.database_url)
        .await
        .expect("database connects and migrates");

    let storage = AudioStorage::new(&config.uploads_dir);

    let context = ServerContext {
        bandstand: Arc::new(Bandstand::new(database, storage)),
    };

    run_server(context, config.port).await
}
