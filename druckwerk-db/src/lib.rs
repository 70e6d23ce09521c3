pub mod client;
pub mod record;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();
