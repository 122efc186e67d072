mod environment;
mod error;

pub use environment::{Environment, StorageBackend};
pub use error::{ApiErrorResponse, AppError};
