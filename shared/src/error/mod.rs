//! Unified error system for the inventory data service
//!
//! - [`ErrorCode`]: Standardized numeric error codes
//! - [`AppError`]: Rich error type with code, message, and details
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 6xxx: Product / stock errors
//! - 9xxx: System errors
//!
//! A presentation layer only needs [`AppError::http_status`]:
//! not-found → 404, invalid input → 400, conflict/duplicate → 409,
//! everything else → 500.
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::not_found("product 42");
//! assert_eq!(err.code, ErrorCode::NotFound);
//! assert_eq!(err.http_status().as_u16(), 404);
//! ```

mod codes;
mod http;
mod types;

pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult};
