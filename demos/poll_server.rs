//! Minimal procedure router for the client demos.
//!
//! Exposes:
//! - `GET  /rpc/getUser?input={"id":N}` - query
//! - `POST /rpc/postMessage` with `{"input": "text"}` - mutation
//! - `PATCH /rpc/messages` with `{"input": cursor}` - long-poll subscription;
//!   answers `408` after 10 seconds without news so the client reconnects
//!
//! Run with: cargo run --example poll_server

use axum::{
    extract::{Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock};

#[derive(Default)]
struct AppState {
    messages: RwLock<Vec<String>>,
    posted: Notify,
}

#[derive(Deserialize)]
struct QueryInput {
    input: Option<String>,
}

#[derive(Deserialize)]
struct BodyInput {
    input: Option<Value>,
}

fn ok(data: Value) -> Json<Value> {
    Json(json!({"ok": true, "data": data}))
}

fn fail(message: &str, status: u16) -> Json<Value> {
    Json(json!({"ok": false, "error": {"message": message, "statusCode": status}}))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let state = Arc::new(AppState::default());
    let app = Router::new()
        .route("/rpc/getUser", get(get_user))
        .route("/rpc/postMessage", post(post_message))
        .route("/rpc/messages", patch(poll_messages))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:4000").await?;
    tracing::info!("router listening on http://127.0.0.1:4000/rpc");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn get_user(Query(query): Query<QueryInput>) -> Json<Value> {
    let input: Option<Value> = query.input.and_then(|raw| serde_json::from_str(&raw).ok());
    match input.as_ref().and_then(|input| input["id"].as_u64()) {
        Some(id) => ok(json!({"id": id, "name": format!("user-{id}")})),
        None => fail("missing id", 400),
    }
}

async fn post_message(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BodyInput>,
) -> Json<Value> {
    let Some(text) = body.input.as_ref().and_then(Value::as_str) else {
        return fail("input must be a string", 400);
    };
    let mut messages = state.messages.write().await;
    messages.push(text.to_string());
    let count = messages.len();
    drop(messages);
    state.posted.notify_waiters();
    ok(json!({"count": count}))
}

async fn poll_messages(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BodyInput>,
) -> Json<Value> {
    let cursor = body.input.and_then(|v| v.as_u64()).unwrap_or(0) as usize;

    loop {
        let posted = state.posted.notified();
        {
            let messages = state.messages.read().await;
            if messages.len() > cursor {
                return ok(json!(messages[cursor..].to_vec()));
            }
        }
        if tokio::time::timeout(Duration::from_secs(10), posted).await.is_err() {
            return fail("no news, please reconnect", 408);
        }
    }
}
