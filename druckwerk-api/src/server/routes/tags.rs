use crate::server::{Result, ServerError, ServerRouter, auth::Superuser, json::Json};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use druckwerk_common::model::{
    Id,
    post::PostMarker,
    tag::{CreateTag, Tag, TagMarker},
};
use druckwerk_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(create_tag)
        .typed_post(delete_tag)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/tags/create", rejection(ServerError))]
struct CreateTagPath {
    id: Id<PostMarker>,
}

async fn create_tag(
    CreateTagPath { id }: CreateTagPath,
    State(db): State<Arc<DbClient>>,
    Superuser(_): Superuser,
    Json(request): Json<CreateTag>,
) -> Result<Json<Tag>> {
    let tag = db
        .create_tag(id, &request.tag_name)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(tag))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/tags/delete", rejection(ServerError))]
struct DeleteTagPath {
    id: Id<PostMarker>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct DeleteTag {
    tag_id: Id<TagMarker>,
}

async fn delete_tag(
    DeleteTagPath { id }: DeleteTagPath,
    State(db): State<Arc<DbClient>>,
    Superuser(_): Superuser,
    Json(request): Json<DeleteTag>,
) -> Result<StatusCode> {
    let deleted = db.delete_tag(id, request.tag_id).await?;
    if !deleted {
        return Err(ServerError::TagByIdNotFound(request.tag_id));
    }

    Ok(StatusCode::NO_CONTENT)
}
