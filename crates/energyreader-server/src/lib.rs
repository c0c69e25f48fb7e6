//! EnergyReader Web Server
//!
//! Axum-based REST API for the EnergyReader bill analytics application.
//!
//! Security features:
//! - Cloudflare Access header, API key or trusted network authentication
//!   (secure by default, use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Input validation (pagination limits, upload size limits)
//! - Full audit logging for all API access (reads and writes)
//! - Sanitized error responses

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use energyreader_core::models::UserRole;
use energyreader_core::{
    BillExtractor, BillRepository, Database, InsightConfig, InsightGenerator,
};

mod handlers;

/// Maximum file upload size (10 MB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Cloudflare Access header for authenticated user email
const CF_ACCESS_USER_HEADER: &str = "cf-access-authenticated-user-email";

/// Authorization header for API key auth
const AUTHORIZATION_HEADER: &str = "authorization";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only in production)
    pub allowed_origins: Vec<String>,
    /// API keys for internal service authentication (alternative to Cloudflare Access)
    /// Format: "Bearer <key>" in Authorization header
    pub api_keys: Vec<String>,
    /// Trusted networks that bypass authentication (e.g., "192.168.1.0/24", "10.0.0.5")
    pub trusted_networks: Vec<ipnet::IpNet>,
    /// Trusted proxies whose X-Forwarded-For headers are trusted
    pub trusted_proxies: Vec<ipnet::IpNet>,
    /// Thresholds for the insight generator
    pub insights: InsightConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
            trusted_networks: vec![],
            trusted_proxies: vec![],
            insights: InsightConfig::default(),
        }
    }
}

/// Shared application state
pub struct AppState {
    /// Writes and the audit log
    pub db: Database,
    /// Reads behind analytics, insights and export
    pub repo: Arc<dyn BillRepository>,
    pub config: ServerConfig,
    pub insights: InsightGenerator,
    pub extractor: BillExtractor,
}

/// Authentication middleware - validates trusted networks, Cloudflare Access headers or API keys
///
/// # Security Notes
///
/// **Trusted networks**: Requests from IPs in `trusted_networks` bypass all authentication.
/// The client IP is the TCP peer address unless that peer is a trusted proxy.
///
/// **Cloudflare Access header**: `CF-Access-Authenticated-User-Email` is safe behind
/// Cloudflare Tunnel (which strips/rewrites CF headers), but can be spoofed if the server
/// is exposed directly to the internet.
///
/// **API keys**: Compared using constant-time comparison to prevent timing attacks.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    connect_info: Option<axum::extract::ConnectInfo<std::net::SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth {
        return next.run(request).await;
    }

    if !state.config.trusted_networks.is_empty() {
        let client_ip = get_client_ip(
            request.headers(),
            connect_info.as_ref(),
            &state.config.trusted_proxies,
        );

        tracing::debug!(
            ?client_ip,
            trusted_networks = ?state.config.trusted_networks,
            path = %request.uri().path(),
            "Checking trusted network auth"
        );

        if let Some(ip) = client_ip {
            if is_ip_trusted(&ip, &state.config.trusted_networks) {
                info!(ip = %ip, path = %request.uri().path(), "Authenticated via trusted network");
                return next.run(request).await;
            }
        }
    }

    if let Some(email) = cf_access_email(request.headers()) {
        info!(user = %email, path = %request.uri().path(), "Authenticated via Cloudflare Access header");
        return next.run(request).await;
    }

    let api_key_valid = request
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|key| validate_api_key(key, &state.config.api_keys))
        .unwrap_or(false);

    if api_key_valid {
        info!(user = "api-key", path = %request.uri().path(), "Authenticated via API key");
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Validate an API key against the configured keys using constant-time comparison
fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();

    valid_keys.iter().any(|key| {
        let key_bytes = key.as_bytes();
        // Only compare if lengths match (constant-time for same-length keys)
        provided_bytes.len() == key_bytes.len() && bool::from(provided_bytes.ct_eq(key_bytes))
    })
}

/// Extract client IP address, respecting trusted proxies
///
/// SECURITY: X-Forwarded-For headers are ONLY trusted when the TCP connection
/// comes from a configured trusted proxy.
pub(crate) fn get_client_ip(
    headers: &HeaderMap,
    connect_info: Option<&axum::extract::ConnectInfo<std::net::SocketAddr>>,
    trusted_proxies: &[ipnet::IpNet],
) -> Option<std::net::IpAddr> {
    let peer_ip = connect_info.map(|ci| ci.0.ip())?;

    if trusted_proxies.is_empty() {
        return Some(peer_ip);
    }

    let peer_is_trusted_proxy = trusted_proxies.iter().any(|net| net.contains(&peer_ip));

    if peer_is_trusted_proxy {
        // "client, proxy1, proxy2" - take the original client
        if let Some(client_ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|ip| ip.trim().parse::<std::net::IpAddr>().ok())
        {
            return Some(client_ip);
        }

        if let Some(client_ip) = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|ip| ip.trim().parse::<std::net::IpAddr>().ok())
        {
            return Some(client_ip);
        }
    }

    Some(peer_ip)
}

/// Check if an IP address is within any of the trusted networks
pub(crate) fn is_ip_trusted(ip: &std::net::IpAddr, trusted_networks: &[ipnet::IpNet]) -> bool {
    trusted_networks.iter().any(|network| network.contains(ip))
}

/// Parse a comma-separated list of IP addresses and CIDR networks
///
/// Examples:
/// - "192.168.1.0/24" - entire subnet
/// - "10.0.0.5" - single IP (parsed as /32 for IPv4 or /128 for IPv6)
/// - "192.168.1.0/24,10.0.0.0/8" - multiple networks
pub fn parse_trusted_networks(input: &str) -> Vec<ipnet::IpNet> {
    input
        .split(',')
        .filter_map(|s| {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if let Ok(net) = s.parse::<ipnet::IpNet>() {
                return Some(net);
            }
            if let Ok(ip) = s.parse::<std::net::IpAddr>() {
                return Some(ipnet::IpNet::from(ip));
            }
            warn!(input = s, "Failed to parse trusted network entry");
            None
        })
        .collect()
}

/// The Cloudflare Access identity, if the header carries one
fn cf_access_email(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(CF_ACCESS_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

/// Extract user email from request headers (for audit logging)
/// Returns CF Access email, "api-key" for API key auth, or "local-dev" for unauthenticated
pub fn get_user_email(headers: &HeaderMap) -> String {
    if let Some(email) = cf_access_email(headers) {
        return email.to_string();
    }

    if headers
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .is_some()
    {
        return "api-key".to_string();
    }

    "local-dev".to_string()
}

/// Check that the caller may use admin operations
///
/// Cloudflare identities must belong to an admin account in the store.
/// API-key and trusted-network callers are services and pass, as does
/// everything when authentication is disabled.
pub(crate) fn require_admin(
    state: &AppState,
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> Result<(), AppError> {
    if !state.config.require_auth {
        return Ok(());
    }

    let client_ip = get_client_ip(headers, connect_info, &state.config.trusted_proxies);
    if client_ip
        .map(|ip| is_ip_trusted(&ip, &state.config.trusted_networks))
        .unwrap_or(false)
    {
        return Ok(());
    }

    let Some(email) = cf_access_email(headers) else {
        // Past auth_middleware without a CF identity means an API key
        return Ok(());
    };

    let is_admin = state
        .db
        .get_user_by_email(email)?
        .map(|u| u.role == UserRole::Admin)
        .unwrap_or(false);

    if is_admin {
        Ok(())
    } else {
        warn!(user = %email, "Admin operation refused");
        Err(AppError::forbidden("Admin access required"))
    }
}

/// Extractor guarding admin-only handlers
pub struct RequireAdmin;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let connect_info = parts.extensions.get::<ConnectInfo<SocketAddr>>();
        require_admin(state, &parts.headers, connect_info)?;
        Ok(Self)
    }
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(
    db: Database,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<Router> {
    let repo: Arc<dyn BillRepository> = Arc::new(db.clone());
    create_router_with_store(db, repo, static_dir, config)
}

/// Create the application router, serving reads from `repo`
pub fn create_router_with_store(
    db: Database,
    repo: Arc<dyn BillRepository>,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<Router> {
    let state = Arc::new(AppState {
        db,
        repo,
        insights: InsightGenerator::with_config(config.insights.clone()),
        extractor: BillExtractor::new()?,
        config: config.clone(),
    });

    info!(rules = ?state.insights.rule_ids(), "Insight generator ready");

    let api_routes = Router::new()
        // Auth
        .route("/me", get(handlers::get_me))
        // Users
        .route("/users", get(handlers::list_users).post(handlers::create_user))
        .route("/users/stats", get(handlers::get_user_stats))
        .route(
            "/users/:id",
            get(handlers::get_user).delete(handlers::delete_user),
        )
        .route("/users/:id/role", put(handlers::update_user_role))
        // Bills
        .route("/bills", get(handlers::list_bills).post(handlers::create_bill))
        .route("/bills/extract", post(handlers::extract_bill))
        .route(
            "/bills/:id",
            get(handlers::get_bill).delete(handlers::delete_bill),
        )
        // Import
        .route("/import", post(handlers::import_csv))
        .route("/import/json", post(handlers::import_csv_json))
        // Analytics
        .route("/analytics/trends", get(handlers::analytics_trends))
        .route("/analytics/regions", get(handlers::analytics_regions))
        .route("/analytics/growth", get(handlers::analytics_growth))
        .route("/analytics/flags", get(handlers::analytics_flags))
        .route("/analytics/chart", get(handlers::analytics_chart))
        .route("/analytics/summary", get(handlers::analytics_summary))
        .route("/admin/metrics", get(handlers::admin_metrics))
        // Insights
        .route("/insights", get(handlers::get_insights))
        // Extraction feedback
        .route(
            "/feedback",
            get(handlers::list_feedback).post(handlers::submit_feedback),
        )
        .route("/feedback/:id", get(handlers::get_feedback))
        .route("/feedback/:id/approve", post(handlers::approve_feedback))
        .route("/feedback/:id/reject", post(handlers::reject_feedback))
        // Export
        .route("/export/:report", get(handlers::export_report))
        // Audit log
        .route("/audit", get(handlers::list_audit_log));

    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' blob: data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'"
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    Ok(app)
}

/// Start the server with default configuration
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
) -> anyhow::Result<()> {
    serve_with_config(db, host, port, static_dir, ServerConfig::default()).await
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    } else if config.api_keys.is_empty() && config.trusted_networks.is_empty() {
        info!("ℹ️  Only Cloudflare Access headers will be accepted (no API keys or trusted networks configured)");
    }

    match db.count_pending_feedback() {
        Ok(count) if count > 0 => info!("{} extraction correction(s) awaiting review", count),
        Ok(_) => {}
        Err(e) => warn!("Failed to count pending feedback: {}", e),
    }

    let app = create_router(db, static_dir, config)?
        .into_make_service_with_connect_info::<std::net::SocketAddr>();
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn forbidden(msg: &str) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unprocessable(msg: &str) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }

    /// Map a core error, keeping client-caused failures out of the 500 bucket
    pub fn from_core(err: energyreader_core::Error) -> Self {
        use energyreader_core::Error;

        match err {
            Error::NotFound(what) => Self::not_found(&format!("{} not found", what)),
            Error::InvalidData(msg) | Error::Import(msg) => Self::bad_request(&msg),
            Error::Csv(e) => Self::bad_request(&format!("Invalid CSV: {}", e)),
            other => other.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
