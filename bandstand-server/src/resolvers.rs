//! Typed route context resolvers.
//!
//! Routes that name an entity in their path declare the matching resolver
//! as a handler parameter. The entity is loaded before the handler body
//! runs, and a missing id short-circuits the chain with a 404, so handlers
//! only ever see entities that exist.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use bandstand_core::{BandData, PrimaryKey, UserData};
use serde::Deserialize;

use crate::{errors::ServerError, ServerContext};

/// The band named by the route's `id` segment
pub struct TargetBand(pub BandData);

/// The user named by the route's `user_id` segment, independent of who is
/// authenticated
pub struct TargetUser(pub UserData);

#[derive(Deserialize)]
struct BandParams {
    id: PrimaryKey,
}

#[derive(Deserialize)]
struct UserParams {
    user_id: PrimaryKey,
}

#[async_trait]
impl FromRequestParts<ServerContext> for TargetBand {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<BandParams>::from_request_parts(parts, state)
            .await
            .map_err(|_| ServerError::Validation("Band id must be a number".to_string()))?;

        let band = state.bandstand.bands.band_by_id(params.id).await?;

        Ok(Self(band))
    }
}

#[async_trait]
impl FromRequestParts<ServerContext> for TargetUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<UserParams>::from_request_parts(parts, state)
            .await
            .map_err(|_| ServerError::Validation("User id must be a number".to_string()))?;

        let user = state.bandstand.auth.user_by_id(params.user_id).await?;

        Ok(Self(user))
    }
}
