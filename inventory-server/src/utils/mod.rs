//! Utility modules

pub mod logger;
pub mod money;
pub mod validation;

pub use logger::init_logger_with_file;
