use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Maps ORM errors to HTTP responses in one place.
#[derive(Debug)]
pub struct ApiError(pub cask_orm::Error);

impl From<cask_orm::Error> for ApiError {
    fn from(e: cask_orm::Error) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        use cask_orm::Error;

        match &self.0 {
            Error::ModelNotFound { .. } => StatusCode::NOT_FOUND,
            Error::FrozenInstance { .. } | Error::NotPersisted { .. } => StatusCode::CONFLICT,
            Error::ImmutablePrimaryKey { .. } | Error::Conversion { .. } | Error::Encode(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("request failed: {}", self.0);
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
