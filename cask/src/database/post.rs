use cask_orm::{CaskEnum, Model, Op, ScopeSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(CaskEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[orm(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Published,
}

#[derive(Model, Debug, Clone)]
#[orm(soft_deletes, boot = "crate::database::post::scopes")]
pub struct Post {
    #[orm(primary_key)]
    pub id: Option<i64>,
    pub title: String,
    pub body: String,
    pub status: PostStatus,
    #[orm(hidden)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

pub fn scopes(scopes: &mut ScopeSet) {
    scopes.define("published", |q, _| q.equals("status", PostStatus::Published));
    scopes.define("search", |q, args| match args.first().and_then(|term| term.as_str()) {
        Some(term) => q.filter("title", Op::Like, format!("%{}%", term)),
        None => q,
    });
}
