use axum::{
    extract::State,
    routing::{get, post},
    Json,
};
use bandstand_core::Credentials;
use serde_json::{json, Value};

use crate::{
    context::ServerContext,
    errors::ServerResult,
    schemas::{LoginSchema, ValidatedJson},
    serialized::{LoginResult, Profile, ToSerialized},
    session::Session,
    Router,
};

#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginSchema,
    responses(
        (status = 200, body = LoginResult),
        (status = 401, description = "Email or password is incorrect")
    )
)]
async fn login(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<LoginSchema>,
) -> ServerResult<Json<LoginResult>> {
    let session = context
        .bandstand
        .auth
        .login(Credentials {
            email: body.email,
            password: body.password,
        })
        .await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/logout",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Session was deleted")
    )
)]
async fn logout(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Value>> {
    context.bandstand.auth.logout(session.token()).await?;

    Ok(Json(json!({})))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Profile)
    )
)]
async fn me(session: Session, State(context): State<ServerContext>) -> ServerResult<Json<Profile>> {
    let user = session.user();
    let bands = context.bandstand.bands.bands_for_user(user.id).await?;

    Ok(Json(Profile {
        user: user.to_serialized(),
        bands: bands.to_serialized(),
    }))
}

pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}
