//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod analytics;
pub mod audit;
pub mod auth;
pub mod bills;
pub mod export;
pub mod feedback;
pub mod insights;
pub mod users;

// Re-export all handlers for use in router
pub use analytics::*;
pub use audit::*;
pub use auth::*;
pub use bills::*;
pub use export::*;
pub use feedback::*;
pub use insights::*;
pub use users::*;

use std::str::FromStr;

use crate::AppError;

/// Parse an optional query parameter, rejecting unknown values with a 400
pub(crate) fn parse_param<T>(value: Option<&str>, name: &str) -> Result<Option<T>, AppError>
where
    T: FromStr<Err = String>,
{
    value
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<T>()
                .map_err(|e| AppError::bad_request(&format!("Invalid '{}': {}", name, e)))
        })
        .transpose()
}
