//! Axum route handlers for the character memo HTTP API.
//!
//! Every mutation is a read-modify-write of one JSON document in the
//! key-value store: load the array, change it in memory, write the whole
//! array back. There is no cross-request coordination, so concurrent
//! writers to the same key can lose updates.

use crate::store::KeyValueStore;
use axum::Router;
use axum::extract::{Path, Request, State};
use axum::http::{Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, put};
use character_memo_types::*;
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};

/// Fixed key holding the character array.
const CHARACTERS_KEY: &str = "characters";

pub struct AppState {
    pub store: Arc<dyn KeyValueStore>,
    pub start_time: Instant,
}

/// Declarative route table for the whole API surface.
///
/// The literal `/order` segment is registered alongside `/:memo_id` at the
/// same position; the router prefers the static match, so a memo can never
/// be literally named "order".
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/characters",
            get(characters_list)
                .post(characters_create)
                .put(characters_update),
        )
        .route(
            "/api/characters/:char_id",
            axum::routing::delete(characters_delete),
        )
        .route(
            "/api/characters/:char_id/memos",
            get(memos_list).post(memos_create),
        )
        .route("/api/characters/:char_id/memos/order", put(memos_reorder))
        .route(
            "/api/characters/:char_id/memos/:memo_id",
            put(memos_update).delete(memos_delete),
        )
        .route("/api/status", get(status))
        .fallback(not_found)
        .with_state(state)
        .layer(cors_layer())
        .layer(middleware::from_fn(preflight))
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

/// Answers every OPTIONS request with 204 and the CORS headers before any
/// routing happens, regardless of path. Non-OPTIONS requests pass through
/// to the router, where [`cors_layer`] decorates the response.
async fn preflight(req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        return (
            StatusCode::NO_CONTENT,
            [
                (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
                (
                    header::ACCESS_CONTROL_ALLOW_METHODS,
                    "GET,POST,PUT,DELETE,OPTIONS",
                ),
                (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
            ],
        )
            .into_response();
    }
    next.run(req).await
}

/// CORS surface: any origin, the five verbs the API answers to, and
/// `Content-Type` as the only request header the clients send.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE])
}

fn memos_key(char_id: &str) -> String {
    format!("memos:{}", char_id)
}

fn load_array<T: serde::de::DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Vec<T>, String> {
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| format!("Corrupt document under '{}': {}", key, e)),
        None => Ok(Vec::new()),
    }
}

fn save_array<T: serde::Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    items: &[T],
) -> Result<(), String> {
    let raw = serde_json::to_string(items)
        .map_err(|e| format!("Failed to encode document under '{}': {}", key, e))?;
    store.put(key, &raw)
}

fn storage_error(e: String) -> Response {
    log::error!("{}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
}

// =====================================================
// Character Endpoints
// =====================================================

// GET /api/characters
pub async fn characters_list(State(state): State<Arc<AppState>>) -> Response {
    match load_array::<Character>(state.store.as_ref(), CHARACTERS_KEY) {
        Ok(list) => Json(list).into_response(),
        Err(e) => storage_error(e),
    }
}

// POST /api/characters
//
// Appends unconditionally — duplicate ids are the caller's problem.
pub async fn characters_create(
    State(state): State<Arc<AppState>>,
    Json(character): Json<Character>,
) -> Response {
    let store = state.store.as_ref();
    let mut list = match load_array::<Character>(store, CHARACTERS_KEY) {
        Ok(list) => list,
        Err(e) => return storage_error(e),
    };
    list.push(character.clone());
    if let Err(e) = save_array(store, CHARACTERS_KEY, &list) {
        return storage_error(e);
    }
    log::info!("Created character '{}' ({} total)", character.id, list.len());
    Json(character).into_response()
}

// PUT /api/characters
//
// Wholesale replacement of the first record matching the body's id.
pub async fn characters_update(
    State(state): State<Arc<AppState>>,
    Json(character): Json<Character>,
) -> Response {
    let store = state.store.as_ref();
    let mut list = match load_array::<Character>(store, CHARACTERS_KEY) {
        Ok(list) => list,
        Err(e) => return storage_error(e),
    };
    let Some(slot) = list.iter_mut().find(|c| c.id == character.id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    *slot = character.clone();
    if let Err(e) = save_array(store, CHARACTERS_KEY, &list) {
        return storage_error(e);
    }
    log::info!("Updated character '{}'", character.id);
    Json(character).into_response()
}

// DELETE /api/characters/:char_id
//
// Filters out every record with the id (duplicates included) and answers
// 204 whether or not anything was removed. The character's memo document
// is left behind under its own key.
pub async fn characters_delete(
    State(state): State<Arc<AppState>>,
    Path(char_id): Path<String>,
) -> Response {
    let store = state.store.as_ref();
    let mut list = match load_array::<Character>(store, CHARACTERS_KEY) {
        Ok(list) => list,
        Err(e) => return storage_error(e),
    };
    let before = list.len();
    list.retain(|c| c.id != char_id);
    if let Err(e) = save_array(store, CHARACTERS_KEY, &list) {
        return storage_error(e);
    }
    log::info!(
        "Deleted character '{}' ({} record(s) removed)",
        char_id,
        before - list.len()
    );
    StatusCode::NO_CONTENT.into_response()
}

// =====================================================
// Memo Endpoints
// =====================================================

// GET /api/characters/:char_id/memos
pub async fn memos_list(
    State(state): State<Arc<AppState>>,
    Path(char_id): Path<String>,
) -> Response {
    match load_array::<Memo>(state.store.as_ref(), &memos_key(&char_id)) {
        Ok(list) => Json(list).into_response(),
        Err(e) => storage_error(e),
    }
}

// POST /api/characters/:char_id/memos
//
// The memo id is the creation instant in epoch milliseconds; two creates
// in the same millisecond collide. Accepted, matching the store's
// no-uniqueness contract.
pub async fn memos_create(
    State(state): State<Arc<AppState>>,
    Path(char_id): Path<String>,
    Json(req): Json<CreateMemoRequest>,
) -> Response {
    let now = Utc::now();
    let memo = Memo {
        memo_id: now.timestamp_millis().to_string(),
        content: req.content,
        created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    };

    let store = state.store.as_ref();
    let key = memos_key(&char_id);
    let mut list = match load_array::<Memo>(store, &key) {
        Ok(list) => list,
        Err(e) => return storage_error(e),
    };
    list.push(memo.clone());
    if let Err(e) = save_array(store, &key, &list) {
        return storage_error(e);
    }
    log::info!(
        "Created memo {} for character '{}' ({} total)",
        memo.memo_id,
        char_id,
        list.len()
    );
    Json(memo).into_response()
}

// PUT /api/characters/:char_id/memos/order
//
// Rebuilds the array in the submitted id order. Ids with no stored match
// are skipped; repeated ids duplicate their record; stored records omitted
// from the submitted list are dropped entirely. The caller must send the
// complete id set to keep everything.
pub async fn memos_reorder(
    State(state): State<Arc<AppState>>,
    Path(char_id): Path<String>,
    Json(id_order): Json<Vec<String>>,
) -> Response {
    let store = state.store.as_ref();
    let key = memos_key(&char_id);
    let list = match load_array::<Memo>(store, &key) {
        Ok(list) => list,
        Err(e) => return storage_error(e),
    };

    let reordered: Vec<Memo> = id_order
        .iter()
        .filter_map(|id| list.iter().find(|m| &m.memo_id == id).cloned())
        .collect();

    if reordered.len() < list.len() {
        log::warn!(
            "Reorder for character '{}' dropped {} stored memo(s) absent from the submitted order",
            char_id,
            list.len() - reordered.len()
        );
    }

    if let Err(e) = save_array(store, &key, &reordered) {
        return storage_error(e);
    }
    Json(reordered).into_response()
}

// PUT /api/characters/:char_id/memos/:memo_id
//
// Edits content in place; memoId and createdAt survive untouched.
pub async fn memos_update(
    State(state): State<Arc<AppState>>,
    Path((char_id, memo_id)): Path<(String, String)>,
    Json(req): Json<UpdateMemoRequest>,
) -> Response {
    let store = state.store.as_ref();
    let key = memos_key(&char_id);
    let mut list = match load_array::<Memo>(store, &key) {
        Ok(list) => list,
        Err(e) => return storage_error(e),
    };
    let Some(memo) = list.iter_mut().find(|m| m.memo_id == memo_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    memo.content = req.content;
    let updated = memo.clone();
    if let Err(e) = save_array(store, &key, &list) {
        return storage_error(e);
    }
    log::info!("Updated memo {} for character '{}'", memo_id, char_id);
    Json(updated).into_response()
}

// DELETE /api/characters/:char_id/memos/:memo_id
pub async fn memos_delete(
    State(state): State<Arc<AppState>>,
    Path((char_id, memo_id)): Path<(String, String)>,
) -> Response {
    let store = state.store.as_ref();
    let key = memos_key(&char_id);
    let mut list = match load_array::<Memo>(store, &key) {
        Ok(list) => list,
        Err(e) => return storage_error(e),
    };
    let before = list.len();
    list.retain(|m| m.memo_id != memo_id);
    if let Err(e) = save_array(store, &key, &list) {
        return storage_error(e);
    }
    log::info!(
        "Deleted memo {} for character '{}' ({} record(s) removed)",
        memo_id,
        char_id,
        before - list.len()
    );
    StatusCode::NO_CONTENT.into_response()
}

// =====================================================
// Service Endpoints
// =====================================================

// GET /api/status
pub async fn status(State(state): State<Arc<AppState>>) -> Response {
    let character_count = match load_array::<Character>(state.store.as_ref(), CHARACTERS_KEY) {
        Ok(list) => list.len(),
        Err(e) => return storage_error(e),
    };
    Json(ServiceStatus {
        running: true,
        uptime_secs: state.start_time.elapsed().as_secs(),
        character_count,
    })
    .into_response()
}
