use crate::server::{Result, ServerError, ServerRouter, json::Json, notify::Notifier};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use druckwerk_common::model::message::{CreateMessage, Message};
use druckwerk_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_post(create_message)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/messages", rejection(ServerError))]
struct CreateMessagePath();

/// Public contact form. Each email address may submit once; the notifier
/// runs after the row is durable and never fails the request.
async fn create_message(
    CreateMessagePath(): CreateMessagePath,
    State(db): State<Arc<DbClient>>,
    State(notifier): State<Arc<Notifier>>,
    Json(request): Json<CreateMessage>,
) -> Result<Json<Message>> {
    let message = db.create_message(&request).await?;

    notifier.notify(&message.notification_text()).await;

    Ok(Json(message))
}
