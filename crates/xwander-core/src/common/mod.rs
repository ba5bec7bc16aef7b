//! Common Utilities
//!
//! Shared error handling, result alias and path helpers.

pub mod error;
pub mod paths;
pub mod result;

pub use error::{ErrorCode, XwanderError};
pub use paths::{config_path, xwander_dir, xwander_path};
pub use result::AppResult;
