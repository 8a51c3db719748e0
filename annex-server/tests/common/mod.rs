//! Shared test utilities for annex-server integration tests

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use annex_core::{EngineConfig, ExtensionHost};
use annex_server::{AnnexServer, AppState, ServerConfig, create_router};
use axum_test::TestServer;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Write `content` at `rel` under `root`, creating parents
pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A project tree with a couple of plugins contributing webui fragments
pub fn sample_project() -> TempDir {
    let project = TempDir::new().unwrap();
    write(
        project.path(),
        "plugins/memory/extensions/webui/sidebar-top/memory-panel.html",
        "<section>memory</section>",
    );
    write(
        project.path(),
        "plugins/memory/extensions/webui/sidebar-top/memory-panel.js",
        "export default {}",
    );
    write(
        project.path(),
        "usr/plugins/theme/extensions/webui/sidebar-top/banner.html",
        "<b>theme</b>",
    );
    write(
        project.path(),
        "webui/index.html",
        r#"<main><x-extension id="sidebar-top"></x-extension></main>"#,
    );
    write(project.path(), "plugins/memory/secret.txt", "not served");
    project
}

/// In-process test server over `project`
pub fn test_server(project: &Path) -> TestServer {
    let host = ExtensionHost::new(EngineConfig::for_project(project));
    let state = AppState::new(host).with_webui_dir(project.join("webui"));
    TestServer::new(create_router(Arc::new(state))).unwrap()
}

/// Spawns a real server on an ephemeral port, returns its address
#[allow(dead_code)]
pub async fn spawn_server(project: &Path) -> SocketAddr {
    let host = ExtensionHost::new(EngineConfig::for_project(project));
    let server = AnnexServer::new(ServerConfig::default(), AppState::new(host));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server.run_with_listener(listener).await;
    });

    // Brief delay to ensure server is accepting connections
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    addr
}
