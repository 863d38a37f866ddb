use std::path::PathBuf;

use axum::Router;
use tempfile::TempDir;

/// Writes `contents` to `relative` under `dir`, creating parent directories.
pub(crate) fn write(dir: &TempDir, relative: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(&path, contents).expect("write fixture");
    path
}

pub(crate) async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake backend");
    let addr = listener.local_addr().expect("backend addr");
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("serve fake backend");
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
