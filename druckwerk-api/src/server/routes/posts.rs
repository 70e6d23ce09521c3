use crate::server::{
    Result, ServerError, ServerRouter, auth::Superuser, files::FileStore, json::Json,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use base64::{Engine, prelude::BASE64_STANDARD};
use druckwerk_common::{
    model::{
        Id,
        post::{FileUpload, Post, PostContent, PostMarker, PostView},
    },
    ordering::PostDirection,
    slug::{self, MediaPath},
};
use druckwerk_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_get(get_post)
        .typed_post(create_post)
        .typed_post(update_post)
        .typed_post(delete_post)
        .typed_post(reposition_post)
}

/// Decodes and stores an inline upload, returning the path it landed at.
pub(crate) async fn store_upload(
    file_store: &FileStore,
    cover_title: &str,
    upload: &FileUpload,
) -> Result<MediaPath> {
    let data = BASE64_STANDARD.decode(&upload.data)?;
    let path = slug::derive_media_path(cover_title, &upload.file_name, slug::random_suffix());

    file_store
        .store(&path, &data)
        .await
        .map_err(ServerError::FileStore)?;

    Ok(path)
}

/// Removes a stored upload whose owning row never materialized. Best
/// effort; the failure that orphaned the file is what the caller reports.
pub(crate) async fn discard_upload(file_store: &FileStore, path: &MediaPath) {
    if let Err(err) = file_store.remove(path).await {
        warn!(%path, error = %err, "Failed to remove orphaned upload");
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct ListPostsPath();

async fn list_posts(
    ListPostsPath(): ListPostsPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<Post>>> {
    let posts = db.list_posts().await?;

    Ok(Json(posts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct GetPostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    GetPostPath { id }: GetPostPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<PostView>> {
    let view = db
        .fetch_post_view(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(view))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/create", rejection(ServerError))]
struct CreatePostPath();

async fn create_post(
    CreatePostPath(): CreatePostPath,
    State(db): State<Arc<DbClient>>,
    State(files): State<Arc<FileStore>>,
    Superuser(_): Superuser,
    Json(content): Json<PostContent>,
) -> Result<Json<Post>> {
    let cover_path = match &content.cover_image {
        Some(upload) => Some(store_upload(&files, &content.cover_title, upload).await?),
        None => None,
    };

    let created = db
        .create_post(
            &content.cover_title,
            &content.cover_description,
            cover_path.as_ref(),
        )
        .await;

    let post = match created {
        Ok(post) => post,
        Err(err) => {
            // The row never landed, so the stored file has no owner.
            if let Some(path) = &cover_path {
                discard_upload(&files, path).await;
            }
            return Err(err.into());
        }
    };

    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/update", rejection(ServerError))]
struct UpdatePostPath {
    id: Id<PostMarker>,
}

async fn update_post(
    UpdatePostPath { id }: UpdatePostPath,
    State(db): State<Arc<DbClient>>,
    State(files): State<Arc<FileStore>>,
    Superuser(_): Superuser,
    Json(content): Json<PostContent>,
) -> Result<Json<Post>> {
    let new_cover = match &content.cover_image {
        Some(upload) => Some(store_upload(&files, &content.cover_title, upload).await?),
        None => None,
    };

    let updated = db
        .update_post(
            id,
            &content.cover_title,
            &content.cover_description,
            new_cover.as_ref(),
        )
        .await;

    let updated = match updated {
        Ok(updated) => updated,
        Err(err) => {
            if let Some(path) = &new_cover {
                discard_upload(&files, path).await;
            }
            return Err(err.into());
        }
    };

    let Some(updated) = updated else {
        // The row never existed, so the file stored for it has no owner.
        if let Some(path) = &new_cover {
            discard_upload(&files, path).await;
        }
        return Err(ServerError::PostByIdNotFound(id));
    };

    // Old cover is gone from the row; drop its file now that the new
    // reference is durable.
    if let Some(superseded) = &updated.superseded_cover {
        files
            .remove(superseded)
            .await
            .map_err(ServerError::FileStore)?;
    }

    Ok(Json(updated.post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/delete", rejection(ServerError))]
struct DeletePostPath {
    id: Id<PostMarker>,
}

async fn delete_post(
    DeletePostPath { id }: DeletePostPath,
    State(db): State<Arc<DbClient>>,
    State(files): State<Arc<FileStore>>,
    Superuser(_): Superuser,
) -> Result<StatusCode> {
    let owned_files = db
        .delete_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    for path in &owned_files {
        files.remove(path).await.map_err(ServerError::FileStore)?;
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/reposition", rejection(ServerError))]
struct RepositionPostPath();

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct RepositionPost {
    id: Id<PostMarker>,
    direction: PostDirection,
}

async fn reposition_post(
    RepositionPostPath(): RepositionPostPath,
    State(db): State<Arc<DbClient>>,
    Superuser(_): Superuser,
    Json(request): Json<RepositionPost>,
) -> Result<StatusCode> {
    let found = db.reposition_post(request.id, request.direction).await?;
    if !found {
        return Err(ServerError::PostByIdNotFound(request.id));
    }

    // A post already at the boundary is a valid no-op, not an error.
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::server::{
        files::FileStore,
        routes::posts::{discard_upload, store_upload},
    };
    use base64::{Engine, prelude::BASE64_STANDARD};
    use druckwerk_common::model::post::FileUpload;

    #[tokio::test]
    async fn failed_row_write_leaves_no_stored_upload() {
        let root =
            std::env::temp_dir().join(format!("druckwerk-upload-test-{}", std::process::id()));
        let store = FileStore::new(root.clone());
        let upload = FileUpload {
            file_name: "cover.png".into(),
            data: BASE64_STANDARD.encode(b"pixels"),
        };

        let path = store_upload(&store, "A Cover", &upload).await.unwrap();
        assert!(root.join(path.get()).exists());

        discard_upload(&store, &path).await;
        assert!(!root.join(path.get()).exists());
        // Discarding an already-removed upload stays quiet.
        discard_upload(&store, &path).await;

        let _ = tokio::fs::remove_dir_all(root).await;
    }
}
