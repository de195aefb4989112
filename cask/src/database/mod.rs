use cask_orm::{Database, DatabaseConfig};

pub mod post;

const CREATE_POSTS: &str = "CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'draft',
    created_at TEXT,
    updated_at TEXT,
    deleted_at TEXT
)";

/// Connects using `DATABASE_URL` and makes sure the demo table exists.
pub async fn initialize() -> Result<Database, Box<dyn std::error::Error>> {
    let config = DatabaseConfig::from_env()?;
    let db = Database::from_config(&config).await?;
    db.raw(CREATE_POSTS).execute().await?;

    log::info!("database ready ({:?})", db.driver());
    Ok(db)
}
