use std::net::{Ipv6Addr, SocketAddr};

use axum::routing::get;
use log::info;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

mod auth;
mod bands;
mod context;
mod docs;
mod errors;
mod logging;
mod multipart;
mod resolvers;
mod schemas;
mod serialized;
mod session;
mod users;

#[cfg(test)]
mod tests;

pub use context::ServerContext;
pub use logging::init_logger;

pub type Router = axum::Router<ServerContext>;

/// Assembles the full route tree with the given context attached
pub fn router(context: ServerContext) -> axum::Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    axum::Router::new()
        .nest("/users", users::router())
        .nest("/bands", bands::router())
        .merge(auth::router())
        .route("/api.json", get(docs::docs))
        .layer(cors)
        .with_state(context)
}

/// Starts the bandstand server
pub async fn run_server(context: ServerContext, port: u16) {
    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    info!("Listening on port {port}");

    axum::serve(listener, router(context).into_make_service())
        .await
        .expect("server runs until shutdown");
}
