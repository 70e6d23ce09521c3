use crate::server::ServerRouter;
use axum::Router;

mod blocks;
mod comments;
mod messages;
mod posts;
mod tags;
mod users;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(posts::routes())
        .merge(blocks::routes())
        .merge(tags::routes())
        .merge(comments::routes())
        .merge(messages::routes())
        .merge(users::routes())
}
