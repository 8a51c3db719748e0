//! Serving the page and plugin fragments from disk

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use annex_core::{EXTENSIONS_DIR, KIND_WEBUI};
use axum::{
    body::Body,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};

use crate::{AppState, render_anchors};

const INDEX: &str = "index.html";

/// Fallback handler.
///
/// `/` renders the page template with its extension anchors filled. Other
/// paths serve a plugin's webui fragment (as listed by the lookup API) or a
/// file from the UI directory.
pub async fn static_handler(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');

    if path.is_empty() || path == INDEX {
        return serve_index(&state).await;
    }

    let Some(relative) = safe_relative(path) else {
        return (StatusCode::BAD_REQUEST, "Invalid path").into_response();
    };

    if let Some(file) = plugin_fragment(&state, &relative) {
        return serve_file(&file).await;
    }

    if let Some(dir) = &state.webui_dir {
        let file = dir.join(&relative);
        if file.is_file() {
            return serve_file(&file).await;
        }
    }

    (StatusCode::NOT_FOUND, "Not found").into_response()
}

async fn serve_index(state: &AppState) -> Response {
    let Some(dir) = &state.webui_dir else {
        return (StatusCode::NOT_FOUND, "Web UI not configured").into_response();
    };

    let template = match tokio::fs::read_to_string(dir.join(INDEX)).await {
        Ok(template) => template,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Page template unavailable");
            return (StatusCode::NOT_FOUND, "Web UI not found").into_response();
        }
    };

    match render_anchors(&template, &state.host) {
        Ok(html) => (
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            html,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render page");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

/// Request path as plain relative segments, rejecting `..` and roots
fn safe_relative(path: &str) -> Option<PathBuf> {
    let relative = PathBuf::from(path);
    relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
        .then_some(relative)
}

/// A file under `<root>/<plugin>/extensions/webui/` of a visible plugin.
///
/// The plugin must be the one the registry resolves its id to, so hidden
/// directories and plugins shadowed by a higher-priority root are not served.
fn plugin_fragment(state: &AppState, relative: &Path) -> Option<PathBuf> {
    let project_root = state.host.config().project_root();
    let file = project_root.join(relative);
    if !file.is_file() {
        return None;
    }

    state.host.registry().list_roots().iter().find_map(|root| {
        let below = file.strip_prefix(root).ok()?;
        let mut parts = below.components().map(|c| c.as_os_str());
        let id = parts.next()?.to_str()?;
        if parts.next()? != OsStr::new(EXTENSIONS_DIR) || parts.next()? != OsStr::new(KIND_WEBUI) {
            return None;
        }

        let plugin = state.host.find_plugin(id)?;
        if plugin.path != root.join(id) {
            tracing::debug!(plugin = %id, file = %file.display(), "Fragment of a shadowed plugin");
            return None;
        }
        Some(file.clone())
    })
}

async fn serve_file(path: &Path) -> Response {
    match tokio::fs::read(path).await {
        Ok(data) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, mime.as_ref())
                .body(Body::from(data))
                .unwrap_or_else(|e| {
                    tracing::error!("Failed to build file response: {e}");
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
                })
        }
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "Failed to read file");
            (StatusCode::NOT_FOUND, "Not found").into_response()
        }
    }
}
