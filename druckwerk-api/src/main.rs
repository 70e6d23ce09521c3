use crate::server::{ServerState, files::FileStore, notify::{Notifier, TelegramNotifier}};
use druckwerk_common::snowflake::{ProcessId, WorkerId};
use druckwerk_db::client::DbClient;
use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod server;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error connecting to the database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Error running migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    database_url: String,
    media_root: PathBuf,
    worker_id: WorkerId,
    process_id: ProcessId,
    telegram_bot_token: Option<String>,
    telegram_chat_id: Option<String>,
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "druckwerk_api=debug,druckwerk_db=debug,druckwerk_common=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

fn build_notifier(env: &Env) -> Notifier {
    match (&env.telegram_bot_token, &env.telegram_chat_id) {
        (Some(bot_token), Some(chat_id)) => {
            Notifier::new(Some(TelegramNotifier::new(bot_token.clone(), chat_id.clone())))
        }
        _ => {
            info!("Telegram notifier not configured");
            Notifier::disabled()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let pool = PgPoolOptions::new().connect(&env.database_url).await?;
    druckwerk_db::MIGRATOR.run(&pool).await?;

    let state = ServerState {
        db_client: Arc::new(DbClient::new(pool, env.worker_id, env.process_id)),
        file_store: Arc::new(FileStore::new(env.media_root.clone())),
        notifier: Arc::new(build_notifier(&env)),
    };

    let tracing_layer = TraceLayer::new_for_http();
    let app = server::routes()
        .with_state(state)
        .layer(tracing_layer);

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
