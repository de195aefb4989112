use axum::{
    Router,
    routing::{get, post},
};

use crate::{AppState, handlers::posts};

pub async fn start_http(a_state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let posts_group = Router::new()
        .route("/", get(posts::index).post(posts::store))
        .route("/{id}", get(posts::show).put(posts::update).delete(posts::destroy))
        .route("/{id}/publish", post(posts::publish));

    let app = Router::new().nest("/posts", posts_group).with_state(a_state);

    let addr = std::env::var("HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:7800".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
