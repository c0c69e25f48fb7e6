//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init and shared utilities (open_db, load_config, parse_period)
//! - `bills` - Bill commands (CSV import, text extraction, listing)
//! - `export` - Report export to CSV/JSON files
//! - `feedback` - Extraction correction workflow
//! - `reports` - Analytics reports and insights
//! - `serve` - Web server command
//! - `status` - Database status
//! - `users` - User management commands

pub mod bills;
pub mod core;
pub mod export;
pub mod feedback;
pub mod reports;
pub mod serve;
pub mod status;
pub mod users;

// Re-export command functions for main.rs
pub use bills::*;
pub use core::*;
pub use export::*;
pub use feedback::*;
pub use reports::*;
pub use serve::*;
pub use status::*;
pub use users::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
