use axum::{
    extract::{Path, State},
    routing::get,
    Json,
};
use bandstand_core::{NewPlainUser, PrimaryKey, UpdatedUser};
use serde_json::{json, Value};

use crate::{
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewUserSchema, UpdateUserSchema, ValidatedJson},
    serialized::{ToSerialized, User},
    Router,
};

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    responses(
        (status = 200, body = Vec<User>)
    )
)]
async fn list_users(State(context): State<ServerContext>) -> ServerResult<Json<Vec<User>>> {
    let users = context.bandstand.auth.users().await?;

    Ok(Json(users.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = NewUserSchema,
    responses(
        (status = 200, body = User),
        (status = 409, description = "A user with that email already exists")
    )
)]
async fn create_user(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewUserSchema>,
) -> ServerResult<Json<User>> {
    let user = context
        .bandstand
        .auth
        .register(NewPlainUser {
            name: body.name,
            email: body.email,
            password: body.password,
        })
        .await?;

    Ok(Json(user.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    responses(
        (status = 200, body = User),
        (status = 404, description = "No user with that id exists")
    )
)]
async fn show_user(
    State(context): State<ServerContext>,
    Path(user_id): Path<PrimaryKey>,
) -> ServerResult<Json<User>> {
    let user = context.bandstand.auth.user_by_id(user_id).await?;

    Ok(Json(user.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/users/{id}",
    tag = "users",
    request_body = UpdateUserSchema,
    responses(
        (status = 200, body = User)
    )
)]
async fn update_user(
    State(context): State<ServerContext>,
    Path(user_id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<UpdateUserSchema>,
) -> ServerResult<Json<User>> {
    let user = context
        .bandstand
        .auth
        .update_user(UpdatedUser {
            id: user_id,
            name: body.name,
            email: body.email,
        })
        .await?;

    Ok(Json(user.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    responses(
        (status = 200, description = "User was deleted"),
        (status = 404, description = "No user with that id exists")
    )
)]
async fn delete_user(
    State(context): State<ServerContext>,
    Path(user_id): Path<PrimaryKey>,
) -> ServerResult<Json<Value>> {
    context.bandstand.auth.delete_user(user_id).await?;

    Ok(Json(json!({})))
}

#[utoipa::path(
    delete,
    path = "/users",
    tag = "users",
    responses(
        (status = 200, description = "All users were deleted")
    )
)]
async fn clear_users(State(context): State<ServerContext>) -> ServerResult<Json<Value>> {
    context.bandstand.auth.delete_all_users().await?;

    Ok(Json(json!({})))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user).delete(clear_users))
        .route(
            "/:id",
            get(show_user).patch(update_user).delete(delete_user),
        )
}
