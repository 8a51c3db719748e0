//! REST API handlers

use std::sync::Arc;

use annex_core::WebuiExtension;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the server
    pub status: String,
    /// Server version
    pub version: String,
    /// Seconds since server started
    pub uptime_seconds: i64,
    /// Number of visible plugins
    pub plugins: usize,
}

/// Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        plugins: state.host.list_plugins().len(),
    })
}

/// Request body for webui extension lookup
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LoadWebuiExtensionsRequest {
    /// Anchor to resolve
    #[serde(default)]
    pub extension_point: Option<String>,
    /// Glob filters; all files when absent or empty
    #[serde(default)]
    pub filters: Option<Vec<String>>,
}

/// Response for webui extension lookup
#[derive(Debug, Serialize, Deserialize)]
pub struct LoadWebuiExtensionsResponse {
    /// Fragments in load order
    pub extensions: Vec<WebuiExtension>,
}

/// POST /api/load_webui_extensions
pub async fn load_webui_extensions(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoadWebuiExtensionsRequest>,
) -> Response {
    let Some(point) = request.extension_point.filter(|p| !p.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing extension_point").into_response();
    };
    let filters = request.filters.unwrap_or_default();

    let extensions = state.host.webui_extensions(&point, &filters);
    tracing::debug!(point = %point, count = extensions.len(), "Resolved webui extensions");

    Json(LoadWebuiExtensionsResponse { extensions }).into_response()
}
