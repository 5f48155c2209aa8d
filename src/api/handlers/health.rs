/*
 * Responsibility
 * - GET /health (疎通用, 認証もセッションも通さない)
 * - 現在の signing key set (件数 / 取得元 / 最終更新) も返す
 */
use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let keys = state.verifier.key_store().snapshot().await.map(|s| {
        json!({
            "source": s.source.as_str(),
            "count": s.key_ids.len(),
            "refreshedAt": s.refreshed_at.to_rfc3339(),
        })
    });

    Json(json!({ "status": "ok", "signingKeys": keys }))
}
