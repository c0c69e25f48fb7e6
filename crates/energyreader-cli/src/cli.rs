//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// EnergyReader - Electricity bill analytics
#[derive(Parser)]
#[command(name = "energyreader")]
#[command(about = "Self-hosted electricity bill reader and analytics", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "energyreader.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set ENERGYREADER_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Config file (defaults to <data dir>/energyreader/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import bills from a CSV file
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Owner of the imported bills
        #[arg(short, long)]
        user: i64,
    },

    /// Extract bill fields from recognized text
    Extract {
        /// Text file with the bill's recognized text
        #[arg(short, long)]
        file: PathBuf,

        /// Store the extracted bill for this user
        #[arg(long)]
        save: Option<i64>,
    },

    /// List bills, most recent first
    Bills {
        /// Only this user's bills
        #[arg(short, long)]
        user: Option<i64>,

        /// Rolling window: 1m, 3m, 6m, 12m, all
        #[arg(short, long, default_value = "all")]
        period: String,

        /// Maximum number of bills to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Manage users (list, add, role, delete)
    Users {
        #[command(subcommand)]
        action: Option<UsersAction>,
    },

    /// Generate analytics reports
    Report {
        #[command(subcommand)]
        report_type: ReportType,
    },

    /// Show advice for a user based on their bill history
    Insights {
        /// User to analyze
        #[arg(short, long)]
        user: i64,
    },

    /// Review extraction corrections
    Feedback {
        #[command(subcommand)]
        action: Option<FeedbackAction>,
    },

    /// Export a report to a file
    Export {
        /// Report: bills, admin_bills, analytics, feedback, users
        report: String,

        /// Output file (defaults to the report's standard file name)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// csv or json (json for bill reports only)
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Rolling window: 1m, 3m, 6m, 12m, all
        #[arg(short, long, default_value = "all")]
        period: String,

        /// Only this user's bills
        #[arg(short, long)]
        user: Option<i64>,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, the server requires Cloudflare Access authentication headers.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Show database status (encryption, size, counts)
    Status,
}

#[derive(Subcommand)]
pub enum UsersAction {
    /// List users
    List {
        /// Match against name or email
        #[arg(short, long)]
        search: Option<String>,

        /// Only users with this role (admin, user)
        #[arg(short, long)]
        role: Option<String>,
    },

    /// Add a user
    Add {
        /// Email address (unique, case-insensitive)
        email: String,

        /// Display name
        #[arg(short, long, default_value = "")]
        name: String,

        /// Role: admin or user
        #[arg(short, long, default_value = "user")]
        role: String,
    },

    /// Change a user's role
    Role {
        /// User ID
        id: i64,

        /// New role: admin or user
        role: String,
    },

    /// Delete a user and all their bills
    Delete {
        /// User ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ReportType {
    /// Monthly averages (consumption and value)
    Trends {
        /// Rolling window: 1m, 3m, 6m, 12m, all
        #[arg(short, long, default_value = "6m")]
        period: String,

        /// Only this user's bills
        #[arg(short, long)]
        user: Option<i64>,
    },

    /// Per-region averages and dominant tariff flag
    Regions {
        #[arg(short, long, default_value = "6m")]
        period: String,

        #[arg(short, long)]
        user: Option<i64>,
    },

    /// Consumption growth between the last two months
    Growth {
        #[arg(short, long, default_value = "6m")]
        period: String,

        #[arg(short, long)]
        user: Option<i64>,
    },

    /// Tariff flag distribution
    Flags {
        #[arg(short, long, default_value = "6m")]
        period: String,

        #[arg(short, long)]
        user: Option<i64>,
    },

    /// Admin dashboard counters
    Metrics,

    /// Dashboard summary for one user
    Summary {
        /// User to summarize
        #[arg(short, long)]
        user: i64,
    },
}

#[derive(Subcommand)]
pub enum FeedbackAction {
    /// List corrections
    List {
        /// Filter by status: pending, approved, rejected
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Submit a correction for one extracted field
    Submit {
        /// Bill being corrected
        #[arg(long)]
        bill: i64,

        /// User submitting the correction
        #[arg(long)]
        user: i64,

        /// Field name (e.g. consumption_kwh, total_value, due_date)
        #[arg(long)]
        field: String,

        /// Corrected value
        #[arg(long)]
        value: String,
    },

    /// Accept a correction
    Approve {
        /// Feedback ID
        id: i64,
    },

    /// Decline a correction
    Reject {
        /// Feedback ID
        id: i64,
    },
}
