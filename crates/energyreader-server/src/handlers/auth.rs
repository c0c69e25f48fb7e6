//! Authentication-related handlers

use axum::extract::Request;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::{get_client_ip, get_user_email, is_ip_trusted, AppState};

/// Response for the /api/me endpoint
#[derive(Serialize)]
pub struct MeResponse {
    /// The authenticated user's email or identifier
    pub user: String,
    /// How the user was authenticated
    pub auth_method: String,
    /// Whether the identity matches an admin account in the store
    pub is_admin: bool,
}

/// GET /api/me - The currently authenticated identity
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    connect_info: Option<axum::extract::ConnectInfo<std::net::SocketAddr>>,
    request: Request,
) -> Json<MeResponse> {
    let header_user = get_user_email(request.headers());

    let client_ip = get_client_ip(
        request.headers(),
        connect_info.as_ref(),
        &state.config.trusted_proxies,
    );

    // Trusted network requests carry no identity headers
    let is_trusted_network = header_user == "local-dev"
        && state.config.require_auth
        && client_ip
            .map(|ip| is_ip_trusted(&ip, &state.config.trusted_networks))
            .unwrap_or(false);

    let (user, auth_method) = if is_trusted_network {
        let ip = client_ip.map(|ip| ip.to_string()).unwrap_or_default();
        (ip, "trusted_network")
    } else if header_user == "api-key" {
        (header_user, "api_key")
    } else if header_user == "local-dev" {
        (header_user, "none")
    } else if header_user.contains('@') {
        (header_user, "cloudflare_header")
    } else {
        (header_user, "unknown")
    };

    let is_admin = state
        .db
        .get_user_by_email(&user)
        .ok()
        .flatten()
        .map(|u| u.role == energyreader_core::models::UserRole::Admin)
        .unwrap_or(false);

    Json(MeResponse {
        user,
        auth_method: auth_method.to_string(),
        is_admin,
    })
}
