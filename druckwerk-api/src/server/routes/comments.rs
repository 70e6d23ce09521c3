use crate::server::{
    Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use druckwerk_common::model::{
    Id,
    comment::{Comment, CommentMarker, CreateComment},
    post::PostMarker,
};
use druckwerk_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(create_comment)
        .typed_post(delete_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comments/create", rejection(ServerError))]
struct CreateCommentPath {
    id: Id<PostMarker>,
}

async fn create_comment(
    CreateCommentPath { id }: CreateCommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateComment>,
) -> Result<Json<Comment>> {
    if request.content.trim().is_empty() {
        return Err(ServerError::EmptyComment);
    }

    let comment = db
        .create_comment(id, user.user_id(), &request.content)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(comment))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comments/delete", rejection(ServerError))]
struct DeleteCommentPath {
    id: Id<PostMarker>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct DeleteComment {
    comment_id: Id<CommentMarker>,
}

async fn delete_comment(
    DeleteCommentPath { id }: DeleteCommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(request): Json<DeleteComment>,
) -> Result<StatusCode> {
    let comment = db
        .fetch_comment(id, request.comment_id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(request.comment_id))?;

    if !comment.deletable_by(user.user_id(), user.is_superuser()) {
        return Err(ServerError::CommentNotDeletable);
    }

    db.delete_comment(comment.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
