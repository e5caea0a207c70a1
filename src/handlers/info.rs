// Server information for the sender page

use crate::AppState;
use crate::network::lan_ipv4;
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Where viewers can reach this server, and which STUN server to use
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    /// `Host` header of the request
    pub host: String,
    /// Private LAN address, empty when none was found
    #[serde(rename = "lanIP")]
    pub lan_ip: String,
    pub stun_server: String,
    pub version: String,
}

/// GET /api/info
pub async fn server_info(State(state): State<AppState>, headers: HeaderMap) -> Json<ServerInfo> {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string();

    Json(ServerInfo {
        host,
        lan_ip: lan_ipv4().map(|ip| ip.to_string()).unwrap_or_default(),
        stun_server: state.stun_server.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/stats
pub async fn stats(State(state): State<AppState>) -> Json<Value> {
    let active = state.sessions.active_session_count().await;
    Json(json!({ "activeSessions": active }))
}
