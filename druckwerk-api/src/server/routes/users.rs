use crate::server::{Result, ServerError, ServerRouter, json::Json, notify::Notifier};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use druckwerk_common::{
    model::{
        Id,
        auth::{AuthToken, Authentication, PasswordHash},
        user::{Email, RegisterUser, User, UserMarker},
    },
    util::PositiveDuration,
};
use druckwerk_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::{Duration, UtcDateTime};

pub const PASSWORD_MIN_LEN: usize = 8;
const TOKEN_LIFETIME_DAYS: i64 = 30;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_user)
        .typed_post(register)
        .typed_post(login)
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct SessionResponse {
    user: User,
    token: String,
}

async fn issue_token(db: &DbClient, user_id: Id<UserMarker>) -> Result<String> {
    let token = AuthToken::generate_random(user_id);
    let token_hash = token.hash()?;

    let expires_after = PositiveDuration::new(Duration::days(TOKEN_LIFETIME_DAYS));
    db.create_auth(&Authentication {
        user: user_id,
        token_hash,
        created_at: UtcDateTime::now(),
        expires_after,
    })
    .await?;

    Ok(token.as_token_str())
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}", rejection(ServerError))]
struct GetUserPath {
    id: Id<UserMarker>,
}

async fn get_user(
    GetUserPath { id }: GetUserPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<User>> {
    let user = db
        .fetch_user(id)
        .await?
        .ok_or(ServerError::UserByIdNotFound(id))?;

    Ok(Json(user))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/register", rejection(ServerError))]
struct RegisterPath();

async fn register(
    RegisterPath(): RegisterPath,
    State(db): State<Arc<DbClient>>,
    State(notifier): State<Arc<Notifier>>,
    Json(request): Json<RegisterUser>,
) -> Result<Json<SessionResponse>> {
    if request.password.chars().count() < PASSWORD_MIN_LEN {
        return Err(ServerError::WeakPassword(PASSWORD_MIN_LEN));
    }

    let password = PasswordHash::generate(&request.password)?;
    let user = db.create_user(&request.email, &password).await?;
    let token = issue_token(&db, user.id).await?;

    notifier
        .notify(&format!("New user\n{}", user.email))
        .await;

    Ok(Json(SessionResponse { user, token }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/login", rejection(ServerError))]
struct LoginPath();

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
struct LoginRequest {
    email: Email,
    password: String,
}

async fn login(
    LoginPath(): LoginPath,
    State(db): State<Arc<DbClient>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let (user, password) = db
        .fetch_credentials(&request.email)
        .await?
        .ok_or(ServerError::InvalidCredentials)?;

    if !password.verify(&request.password)? {
        return Err(ServerError::InvalidCredentials);
    }

    let token = issue_token(&db, user.id).await?;
    Ok(Json(SessionResponse { user, token }))
}
