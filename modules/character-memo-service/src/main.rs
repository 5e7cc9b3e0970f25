//! Character Memo Service — standalone binary for the character memo API.
//!
//! Named characters, each owning an ordered list of rich-text memos, stored
//! as JSON documents in a flat key-value namespace.
//! Default: http://127.0.0.1:9107/

mod routes;
mod store;

use routes::AppState;
use std::sync::Arc;
use std::time::Instant;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let port: u16 = std::env::var("CHARA_MEMO_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(9107);

    let db_path =
        std::env::var("CHARA_MEMO_DB_PATH").unwrap_or_else(|_| "./chara_memo.db".to_string());

    log::info!("Opening key-value store at: {}", db_path);
    let store = Arc::new(store::SqliteStore::open(&db_path).expect("Failed to open store"));

    let state = Arc::new(AppState {
        store,
        start_time: Instant::now(),
    });

    let app = routes::build_router(state);

    let addr = format!("127.0.0.1:{}", port);
    log::info!("Character Memo Service listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app).await.expect("Server error");
}
