use axum::{
    extract::{Multipart, Path, State},
    response::Response,
    routing::{get, post},
    Json,
};
use bandstand_core::{PrimaryKey, UpdatedBand};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    context::ServerContext,
    errors::{ServerError, ServerResult},
    multipart::audio_response,
    resolvers::{TargetBand, TargetUser},
    schemas::{NewBandSchema, UpdateBandSchema, ValidatedJson},
    serialized::{Audio, Band, BandWithAudios, ToSerialized},
    session::Session,
    Router,
};

#[derive(Deserialize)]
struct AudioParams {
    audio_id: PrimaryKey,
}

#[utoipa::path(
    get,
    path = "/bands/all",
    tag = "bands",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Band>)
    )
)]
async fn all_bands(
    _session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Band>>> {
    let bands = context.bandstand.bands.all_bands().await?;

    Ok(Json(bands.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/bands",
    tag = "bands",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Band>)
    )
)]
async fn my_bands(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Band>>> {
    let bands = context
        .bandstand
        .bands
        .bands_for_user(session.user().id)
        .await?;

    Ok(Json(bands.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/bands",
    tag = "bands",
    request_body = NewBandSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Band),
        (status = 409, description = "A band with that name already exists")
    )
)]
async fn create_band(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewBandSchema>,
) -> ServerResult<Json<Band>> {
    let band = context
        .bandstand
        .bands
        .create_band(body.name, session.user().id)
        .await?;

    Ok(Json(band.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/bands/{id}",
    tag = "bands",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = BandWithAudios),
        (status = 404, description = "No band with that id exists")
    )
)]
async fn show_band(
    _session: Session,
    State(context): State<ServerContext>,
    TargetBand(band): TargetBand,
) -> ServerResult<Json<BandWithAudios>> {
    let audios = context.bandstand.bands.audios(band.id).await?;

    Ok(Json((band, audios).to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/bands/{id}",
    tag = "bands",
    request_body = UpdateBandSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Band)
    )
)]
async fn update_band(
    _session: Session,
    State(context): State<ServerContext>,
    TargetBand(band): TargetBand,
    ValidatedJson(body): ValidatedJson<UpdateBandSchema>,
) -> ServerResult<Json<Band>> {
    let band = context
        .bandstand
        .bands
        .update_band(UpdatedBand {
            id: band.id,
            name: body.name,
        })
        .await?;

    Ok(Json(band.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/bands/{id}",
    tag = "bands",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Band, memberships, and audio were deleted"),
        (status = 404, description = "No band with that id exists")
    )
)]
async fn delete_band(
    _session: Session,
    State(context): State<ServerContext>,
    TargetBand(band): TargetBand,
) -> ServerResult<Json<Value>> {
    context.bandstand.bands.delete_band(band.id).await?;

    Ok(Json(json!({})))
}

#[utoipa::path(
    post,
    path = "/bands/{id}/user/{user_id}",
    tag = "bands",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Band),
        (status = 404, description = "No band or user with that id exists"),
        (status = 409, description = "User is already in that band")
    )
)]
async fn connect(
    _session: Session,
    State(context): State<ServerContext>,
    TargetBand(band): TargetBand,
    TargetUser(user): TargetUser,
) -> ServerResult<Json<Band>> {
    context.bandstand.bands.connect(user.id, band.id).await?;

    Ok(Json(band.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/bands/{id}/user/{user_id}",
    tag = "bands",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Band),
        (status = 404, description = "No such band, user, or membership")
    )
)]
async fn disconnect(
    _session: Session,
    State(context): State<ServerContext>,
    TargetBand(band): TargetBand,
    TargetUser(user): TargetUser,
) -> ServerResult<Json<Band>> {
    context.bandstand.bands.disconnect(user.id, band.id).await?;

    Ok(Json(band.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/bands/{id}/upload",
    tag = "bands",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Audio),
        (status = 400, description = "Multipart fields are missing or the payload is empty")
    )
)]
async fn upload_audio(
    _session: Session,
    State(context): State<ServerContext>,
    TargetBand(band): TargetBand,
    mut multipart: Multipart,
) -> ServerResult<Json<Audio>> {
    let mut name = None;
    let mut bytes = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ServerError::Validation("Malformed multipart body".to_string()))?
    {
        match field.name() {
            Some("name") => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| ServerError::Validation("Unreadable name field".to_string()))?;

                name = Some(value);
            }
            Some("audio") => {
                let value = field
                    .bytes()
                    .await
                    .map_err(|_| ServerError::Validation("Unreadable audio field".to_string()))?;

                bytes = Some(value);
            }
            _ => {}
        }
    }

    let name = name.ok_or_else(|| ServerError::Validation("A name field is required".to_string()))?;
    let bytes = bytes
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ServerError::Validation("A non-empty audio field is required".to_string()))?;

    let audio = context
        .bandstand
        .bands
        .upload_audio(band.id, name, &bytes)
        .await?;

    Ok(Json(audio.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/bands/{id}/audio/{audio_id}",
    tag = "bands",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (
            status = 200,
            content_type = "multipart/mixed",
            description = "A JSON metadata part followed by the audio bytes"
        ),
        (status = 404, description = "No audio with that id exists in this band")
    )
)]
async fn download_audio(
    _session: Session,
    State(context): State<ServerContext>,
    TargetBand(band): TargetBand,
    Path(params): Path<AudioParams>,
) -> ServerResult<Response> {
    let (audio, bytes) = context
        .bandstand
        .bands
        .audio_with_bytes(band.id, params.audio_id)
        .await?;

    let metadata = serde_json::to_vec(&audio.to_serialized())
        .map_err(|e| ServerError::Unknown(e.to_string()))?;

    Ok(audio_response(metadata, bytes))
}

#[utoipa::path(
    delete,
    path = "/bands/{id}/audio/{audio_id}",
    tag = "bands",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Audio row and backing file were deleted"),
        (status = 404, description = "No audio with that id exists in this band")
    )
)]
async fn delete_audio(
    _session: Session,
    State(context): State<ServerContext>,
    TargetBand(band): TargetBand,
    Path(params): Path<AudioParams>,
) -> ServerResult<Json<Value>> {
    context
        .bandstand
        .bands
        .delete_audio(band.id, params.audio_id)
        .await?;

    Ok(Json(json!({})))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(my_bands).post(create_band))
        .route("/all", get(all_bands))
        .route(
            "/:id",
            get(show_band).patch(update_band).delete(delete_band),
        )
        .route("/:id/user/:user_id", post(connect).delete(disconnect))
        .route("/:id/upload", post(upload_audio))
        .route(
            "/:id/audio/:audio_id",
            get(download_audio).delete(delete_audio),
        )
}
