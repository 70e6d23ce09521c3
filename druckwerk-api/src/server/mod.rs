use crate::server::{files::FileStore, notify::Notifier};
use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use druckwerk_common::model::{
    Id,
    auth::{AuthTokenDecodeError, HashError},
    block::BlockMarker,
    comment::CommentMarker,
    post::PostMarker,
    tag::TagMarker,
    user::UserMarker,
};
use druckwerk_db::client::{DbClient, DbError};
use json::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

pub mod auth;
pub mod files;
pub mod json;
pub mod notify;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub file_store: Arc<FileStore>,
    pub notifier: Arc<Notifier>,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The provided auth token could not be decoded: {0}")]
    InvalidAuthToken(#[from] AuthTokenDecodeError),
    #[error("Hashing failed: {0}")]
    Hash(#[from] HashError),
    #[error("Provided token was invalid")]
    InvalidToken,
    #[error("Email or password was incorrect")]
    InvalidCredentials,
    #[error("The password must be at least {0} characters long")]
    WeakPassword(usize),
    #[error("The requested action requires superuser rights")]
    Forbidden,
    #[error("You do not have permission to delete this comment")]
    CommentNotDeletable,
    #[error("Comment content is required")]
    EmptyComment,
    #[error("Uploaded file data was not valid base64: {0}")]
    InvalidUpload(#[from] base64::DecodeError),
    #[error("File storage failed: {0}")]
    FileStore(std::io::Error),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("Block with id {0} was not found.")]
    BlockByIdNotFound(Id<BlockMarker>),
    #[error("Tag with id {0} was not found.")]
    TagByIdNotFound(Id<TagMarker>),
    #[error("Comment with id {0} was not found.")]
    CommentByIdNotFound(Id<CommentMarker>),
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::BlockByIdNotFound(_)
            | ServerError::TagByIdNotFound(_)
            | ServerError::CommentByIdNotFound(_)
            | ServerError::UserByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::InvalidToken | ServerError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::Forbidden | ServerError::CommentNotDeletable => StatusCode::FORBIDDEN,
            ServerError::Database(DbError::DuplicateEmail) => StatusCode::CONFLICT,
            ServerError::JsonRejection(_)
            | ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAuthToken(_)
            | ServerError::WeakPassword(_)
            | ServerError::EmptyComment
            | ServerError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::Hash(_)
            | ServerError::FileStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
        };
        (status, Json(error_response)).into_response()
    }
}
