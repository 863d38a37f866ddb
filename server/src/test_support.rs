use std::path::PathBuf;
use std::time::Duration;

use axum::Router;
use tempfile::TempDir;

use crate::config::ServerConfig;
use crate::state::AppState;

pub(crate) const REGIONS_JSON: &str = r#"[
    {
        "slug": "lake-victoria",
        "name": "Lake Victoria",
        "description": "Water hyacinth and algal blooms",
        "center": [33.0, -1.0],
        "boundingBox": [31.5, -3.0, 34.9, 0.6],
        "zoom": 7,
        "instruments": ["MODIS"],
        "timeRange": {"start": "2000", "end": "2024"}
    },
    {
        "slug": "aral-sea",
        "name": "Aral Sea",
        "center": [60.0, 45.0],
        "zoom": 6,
        "timeRange": {"start": 2000, "end": 2020}
    }
]"#;

/// Writes `contents` to `relative` under `dir`, creating parent directories.
pub(crate) fn write(dir: &TempDir, relative: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(&path, contents).expect("write fixture");
    path
}

pub(crate) async fn spawn_router(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve test app");
    });
    format!("http://{addr}")
}

/// A base URL nothing is listening on.
pub(crate) async fn dead_backend() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind unused port");
    let addr = listener.local_addr().expect("unused addr");
    drop(listener);
    format!("http://{addr}")
}

/// Config pointing at `backend_url`, with data, snapshot and catalogue under `dir`.
pub(crate) fn test_config(backend_url: &str, dir: &TempDir) -> ServerConfig {
    ServerConfig {
        port: 0,
        backend_url: backend_url.to_string(),
        data_dir: dir.path().join("public"),
        snapshot_path: dir.path().join("snapshot.json"),
        regions_path: dir.path().join("regions.json"),
        upstream_timeout: Duration::from_secs(2),
        upstream_connect_timeout: Duration::from_secs(1),
    }
}

pub(crate) fn test_state(backend_url: &str, dir: &TempDir) -> AppState {
    let regions = terra_shared::region::parse_regions(REGIONS_JSON).expect("fixture catalogue");
    AppState::new(test_config(backend_url, dir), regions).expect("build app state")
}

pub(crate) async fn spawn_test_server(state: AppState) -> String {
    spawn_router(crate::app::build_app(state)).await
}
