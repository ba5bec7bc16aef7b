//! Common Result Type
//!
//! Type alias for library results.

use super::error::XwanderError;

/// Library result type
///
/// Uses XwanderError so callers can map failures to a plugin exit code.
pub type AppResult<T> = Result<T, XwanderError>;
