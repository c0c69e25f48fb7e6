//! EnergyReader CLI - Electricity bill analytics
//!
//! Usage:
//!   energyreader init                          Initialize database
//!   energyreader import --file bills.csv -u 1  Import bills for a user
//!   energyreader report trends --period 6m     Monthly trends
//!   energyreader serve --port 3000             Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Import { file, user } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_import(&db, &file, user)
        }
        Commands::Extract { file, save } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_extract(&db, &file, save)
        }
        Commands::Bills {
            user,
            period,
            limit,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let period = commands::parse_period(&period)?;
            commands::cmd_bills_list(&db, user, period, limit)
        }
        Commands::Users { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_users_list(&db, None, None),
                Some(UsersAction::List { search, role }) => {
                    commands::cmd_users_list(&db, search.as_deref(), role.as_deref())
                }
                Some(UsersAction::Add { email, name, role }) => {
                    commands::cmd_users_add(&db, &email, &name, &role)
                }
                Some(UsersAction::Role { id, role }) => commands::cmd_users_role(&db, id, &role),
                Some(UsersAction::Delete { id }) => commands::cmd_users_delete(&db, id),
            }
        }
        Commands::Report { report_type } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match report_type {
                ReportType::Trends { period, user } => {
                    let period = commands::parse_period(&period)?;
                    commands::cmd_report_trends(&db, period, user)
                }
                ReportType::Regions { period, user } => {
                    let period = commands::parse_period(&period)?;
                    commands::cmd_report_regions(&db, period, user)
                }
                ReportType::Growth { period, user } => {
                    let period = commands::parse_period(&period)?;
                    commands::cmd_report_growth(&db, period, user)
                }
                ReportType::Flags { period, user } => {
                    let period = commands::parse_period(&period)?;
                    commands::cmd_report_flags(&db, period, user)
                }
                ReportType::Metrics => commands::cmd_report_metrics(&db),
                ReportType::Summary { user } => commands::cmd_report_summary(&db, user),
            }
        }
        Commands::Insights { user } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_insights(&db, user, &config)
        }
        Commands::Feedback { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_feedback_list(&db, Some("pending")),
                Some(FeedbackAction::List { status }) => {
                    commands::cmd_feedback_list(&db, status.as_deref())
                }
                Some(FeedbackAction::Submit {
                    bill,
                    user,
                    field,
                    value,
                }) => commands::cmd_feedback_submit(&db, bill, user, &field, &value),
                Some(FeedbackAction::Approve { id }) => commands::cmd_feedback_approve(&db, id),
                Some(FeedbackAction::Reject { id }) => commands::cmd_feedback_reject(&db, id),
            }
        }
        Commands::Export {
            report,
            output,
            format,
            period,
            user,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let period = commands::parse_period(&period)?;
            commands::cmd_export(&db, &report, output, &format, period, user)
        }
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_serve(
                &cli.db,
                &host,
                port,
                no_auth,
                cli.no_encrypt,
                static_dir.as_deref(),
                config,
            )
            .await
        }
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt),
    }
}
