#![allow(dead_code)]

use cask_orm::{CaskEnum, Database, Model, ModelConfig, NoTimestamps, ScopeSet};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Model, PartialEq)]
pub struct Post {
    #[orm(primary_key)]
    pub id: Option<i64>,
    pub title: String,
    pub body: String,
    pub views: i64,
    pub summary: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Model)]
#[orm(soft_deletes)]
pub struct Article {
    #[orm(primary_key)]
    pub id: Option<i64>,
    pub title: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Model)]
pub struct User {
    #[orm(primary_key)]
    pub id: Option<i64>,
    pub email: String,
    #[orm(hidden)]
    pub password: String,
    pub status: Status,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, CaskEnum)]
#[orm(rename_all = "snake_case")]
pub enum Status {
    Active,
    OnHold,
}

#[derive(Debug, Clone, Model, PartialEq)]
#[orm(incrementing = false, timestamps = false)]
pub struct Token {
    #[orm(primary_key)]
    pub id: Uuid,
    pub name: String,
}

/// A model written by hand, without the derive.
pub struct Comment;

impl Model for Comment {
    fn config() -> ModelConfig {
        ModelConfig::for_model("Comment").with(NoTimestamps).with_visible(&["id", "body"])
    }

    fn boot(scopes: &mut ScopeSet) {
        scopes.define("approved", |q, _| q.equals("approved", 1));
        scopes.define("scopeByAuthor", |q, args| match args.first() {
            Some(author) => q.equals("author", author.clone()),
            None => q,
        });
        scopes.add_global("not_spam", |q, _| q.equals("spam", 0));
    }
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        body TEXT NOT NULL,
        views INTEGER NOT NULL DEFAULT 0,
        summary TEXT,
        created_at TEXT,
        updated_at TEXT
    )",
    "CREATE TABLE articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        created_at TEXT,
        updated_at TEXT,
        deleted_at TEXT
    )",
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL,
        password TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT,
        updated_at TEXT
    )",
    "CREATE TABLE tokens (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL
    )",
    "CREATE TABLE comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        body TEXT NOT NULL,
        author TEXT NOT NULL,
        approved INTEGER NOT NULL DEFAULT 0,
        spam INTEGER NOT NULL DEFAULT 0
    )",
];

/// A single-connection in-memory database with every test table.
pub async fn setup() -> Result<Database, Box<dyn std::error::Error>> {
    let _ = env_logger::builder().is_test(true).try_init();
    let db = Database::builder().max_connections(1).connect("sqlite::memory:").await?;
    for ddl in SCHEMA {
        db.raw(ddl).execute().await?;
    }
    Ok(db)
}
