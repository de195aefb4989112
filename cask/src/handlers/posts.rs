use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use cask_orm::{Direction, Instance, Paginated, attributes};
use serde::Deserialize;

use crate::{
    AppState,
    database::post::{Post, PostStatus},
    handlers::ApiError,
};

#[derive(Debug, Deserialize)]
pub struct IndexParams {
    #[serde(default = "first_page")]
    page: u64,
    #[serde(default = "default_per_page")]
    per_page: u64,
    #[serde(default)]
    published: bool,
    search: Option<String>,
}

fn first_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<IndexParams>,
) -> Result<Json<Paginated<Instance<Post>>>, ApiError> {
    let mut query = state.db.model::<Post>().order_by("id", Direction::Desc);
    if params.published {
        query = query.scope("published");
    }
    if let Some(term) = params.search {
        query = query.scope_with("search", [term]);
    }

    Ok(Json(query.paginate(params.page, params.per_page).await?))
}

pub async fn show(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Instance<Post>>, ApiError> {
    let post = state.db.model::<Post>().find_or_fail(id).await?;
    Ok(Json(post))
}

#[derive(Debug, Deserialize)]
pub struct NewPost {
    title: String,
    body: String,
}

pub async fn store(
    State(state): State<AppState>,
    Json(req): Json<NewPost>,
) -> Result<(StatusCode, Json<Instance<Post>>), ApiError> {
    let post = state
        .db
        .model::<Post>()
        .create(attributes! {
            "title" => req.title,
            "body" => req.body,
            "status" => PostStatus::Draft,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(changes): Json<serde_json::Value>,
) -> Result<Json<Instance<Post>>, ApiError> {
    let mut post = state.db.model::<Post>().find_or_fail(id).await?;
    post.fill(changes)?;
    post.save(&state.db).await?;
    Ok(Json(post))
}

pub async fn destroy(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    let mut post = state.db.model::<Post>().find_or_fail(id).await?;
    post.delete(&state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Publishes a post and returns it, inside a transaction.
pub async fn publish(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Instance<Post>>, ApiError> {
    let trx = state.db.begin().await?;

    let mut post = trx.model::<Post>().find_or_fail(id).await?;
    post.set("status", PostStatus::Published)?;
    post.save(&state.db).await?;

    trx.commit().await?;
    log::info!("post {} published", id);
    Ok(Json(post))
}
