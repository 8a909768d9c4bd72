//! Shared helpers: a session wired against a wiremock server.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};
use wiremock::MockServer;

use wsoptv::app::AppContext;
use wsoptv::config::ClientConfig;
use wsoptv::storage::{LocalStorage, MemoryStorage};

/// Config pointed at `server` with retry off so failures surface at once.
pub fn config_for(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.base_url = server.uri();
    config.timeout_secs = 5;
    config.retry.enabled = false;
    config.search.debounce_ms = 50;
    config.search.suggest_debounce_ms = 50;
    config
}

pub fn app_for(server: &MockServer) -> (AppContext, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let app = AppContext::with_storage(config_for(server), storage.clone() as Arc<dyn LocalStorage>);
    (app, storage)
}

pub fn user_json(username: &str) -> Value {
    json!({
        "id": 7,
        "username": username,
        "displayName": "Player One",
        "role": "user",
        "status": "approved",
        "createdAt": "2024-01-02T03:04:05Z"
    })
}

pub fn tokens_json() -> Value {
    json!({
        "accessToken": "access-1",
        "refreshToken": "refresh-1",
        "expiresAt": 4_102_444_800_000i64
    })
}

pub fn content_json(id: i64, title: &str) -> Value {
    json!({
        "id": id,
        "catalogId": "wsop",
        "catalogName": "WSOP",
        "title": title,
        "episode": id,
        "fileId": id * 10,
        "durationSec": 3600,
        "handCount": 12,
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-01T00:00:00Z"
    })
}

pub fn page_json(items: Vec<Value>, page: u32, has_more: bool) -> Value {
    json!({
        "items": items,
        "total": 40,
        "page": page,
        "totalPages": 2,
        "hasMore": has_more
    })
}

pub fn search_result_json(titles: &[&str]) -> Value {
    let hits: Vec<Value> = titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            json!({
                "id": i as i64 + 1,
                "title": title,
                "catalogName": "WSOP",
                "durationSec": 1800,
                "handCount": 4,
                "highlights": [],
                "score": 0.9
            })
        })
        .collect();
    json!({
        "hits": hits,
        "totalHits": titles.len(),
        "page": 1,
        "totalPages": 1,
        "processingTimeMs": 3,
        "facets": []
    })
}
