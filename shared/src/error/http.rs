//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists | Self::ConcurrentModification => StatusCode::CONFLICT,

            // 400 Bad Request
            Self::ValidationFailed | Self::ProductOutOfStock => StatusCode::BAD_REQUEST,

            // 500 Internal Server Error
            Self::InternalError | Self::DatabaseError | Self::TimeoutError | Self::Cancelled => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
