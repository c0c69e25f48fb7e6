//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};
use energyreader_core::AppConfig;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    no_encrypt: bool,
    static_dir: Option<&Path>,
    app_config: AppConfig,
) -> Result<()> {
    println!("🚀 Starting EnergyReader web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }

    // Parse API keys from environment (comma-separated)
    let api_keys: Vec<String> = std::env::var("ENERGYREADER_API_KEYS")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    // Parse trusted networks (for local network access without auth)
    let trusted_networks_str = std::env::var("ENERGYREADER_TRUSTED_NETWORKS").unwrap_or_default();
    let trusted_networks = energyreader_server::parse_trusted_networks(&trusted_networks_str);

    // Parse trusted proxies (for extracting real client IP behind reverse proxies)
    let trusted_proxies_str = std::env::var("ENERGYREADER_TRUSTED_PROXIES").unwrap_or_default();
    let trusted_proxies = energyreader_server::parse_trusted_networks(&trusted_proxies_str);

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else {
        println!("   🔒 Authentication: Cloudflare Access (header)");
        if !api_keys.is_empty() {
            println!(
                "   🔑 API keys: {} configured (ENERGYREADER_API_KEYS)",
                api_keys.len()
            );
        }
        if !trusted_networks.is_empty() {
            println!(
                "   🏠 Trusted networks: {} (ENERGYREADER_TRUSTED_NETWORKS)",
                trusted_networks
                    .iter()
                    .map(|n| n.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        if !trusted_proxies.is_empty() {
            println!(
                "   🔀 Trusted proxies: {} (ENERGYREADER_TRUSTED_PROXIES)",
                trusted_proxies
                    .iter()
                    .map(|n| n.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let config = energyreader_server::ServerConfig {
        require_auth: !no_auth,
        allowed_origins: vec![],
        api_keys,
        trusted_networks,
        trusted_proxies,
        insights: app_config.insights,
    };

    let static_dir_str = static_dir
        .map(|p| p.to_str().context("static_dir path must be valid UTF-8"))
        .transpose()?;
    energyreader_server::serve_with_config(db, host, port, static_dir_str, config).await?;

    Ok(())
}
