use crate::server::{
    Result, ServerError, ServerRouter, auth::Superuser, files::FileStore, json::Json,
    routes::posts::{discard_upload, store_upload},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use druckwerk_common::{
    model::{
        Id,
        block::{Block, BlockContent, BlockMarker, CreateBlock, NewBlockContent},
        post::PostMarker,
    },
    ordering::BlockDirection,
};
use druckwerk_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(create_block)
        .typed_post(delete_block)
        .typed_post(reposition_block)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/blocks/create", rejection(ServerError))]
struct CreateBlockPath {
    id: Id<PostMarker>,
}

async fn create_block(
    CreateBlockPath { id }: CreateBlockPath,
    State(db): State<Arc<DbClient>>,
    State(files): State<Arc<FileStore>>,
    Superuser(_): Superuser,
    Json(request): Json<CreateBlock>,
) -> Result<Json<Option<Block>>> {
    // A request carrying no recognized payload creates nothing and is
    // still a success.
    let Some(payload) = request.resolve() else {
        return Ok(Json(None));
    };

    let content = match payload {
        NewBlockContent::Text(text) => BlockContent::Text {
            text: text.text,
            text_type: text.text_type,
            text_alignment: text.text_alignment,
        },
        NewBlockContent::Image(image) => {
            let post = db
                .fetch_post(id)
                .await?
                .ok_or(ServerError::PostByIdNotFound(id))?;
            let path = store_upload(&files, &post.cover_title, &image.image).await?;

            BlockContent::Image {
                image: path,
                image_size: image.image_size,
                image_alignment: image.image_alignment,
            }
        }
        NewBlockContent::Space(space) => BlockContent::Space {
            space_number: space.space_number,
        },
    };

    let block = match db.create_block(id, &content).await {
        Ok(Some(block)) => block,
        // The row never landed (post vanished or the write failed), so any
        // stored image has no owner.
        Ok(None) => {
            if let BlockContent::Image { image, .. } = &content {
                discard_upload(&files, image).await;
            }
            return Err(ServerError::PostByIdNotFound(id));
        }
        Err(err) => {
            if let BlockContent::Image { image, .. } = &content {
                discard_upload(&files, image).await;
            }
            return Err(err.into());
        }
    };

    Ok(Json(Some(block)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/blocks/delete", rejection(ServerError))]
struct DeleteBlockPath {
    id: Id<PostMarker>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct DeleteBlock {
    block_id: Id<BlockMarker>,
}

async fn delete_block(
    DeleteBlockPath { id }: DeleteBlockPath,
    State(db): State<Arc<DbClient>>,
    State(files): State<Arc<FileStore>>,
    Superuser(_): Superuser,
    Json(request): Json<DeleteBlock>,
) -> Result<StatusCode> {
    let removed_file = db
        .delete_block(id, request.block_id)
        .await?
        .ok_or(ServerError::BlockByIdNotFound(request.block_id))?;

    if let Some(path) = &removed_file {
        files.remove(path).await.map_err(ServerError::FileStore)?;
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/blocks/reposition", rejection(ServerError))]
struct RepositionBlockPath {
    id: Id<PostMarker>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct RepositionBlock {
    block_id: Id<BlockMarker>,
    direction: BlockDirection,
}

async fn reposition_block(
    RepositionBlockPath { id }: RepositionBlockPath,
    State(db): State<Arc<DbClient>>,
    Superuser(_): Superuser,
    Json(request): Json<RepositionBlock>,
) -> Result<StatusCode> {
    let found = db
        .reposition_block(id, request.block_id, request.direction)
        .await?;
    if !found {
        return Err(ServerError::BlockByIdNotFound(request.block_id));
    }

    Ok(StatusCode::NO_CONTENT)
}
