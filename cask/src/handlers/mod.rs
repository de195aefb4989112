mod error;
pub mod posts;

pub use error::ApiError;
