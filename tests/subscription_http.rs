//! Subscriptions and cancellation over real HTTP against an in-process axum router.

use axum::extract::State;
use axum::routing::{get, patch};
use axum::{Json, Router};
use rpc_router_client::{Client, SubscriptionOptions};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Default)]
struct PollState {
    polls: AtomicUsize,
    inputs: parking_lot::Mutex<Vec<Value>>,
}

/// First poll: reconnect. Second: data. Later polls hold until the client drops them.
async fn poll(State(state): State<Arc<PollState>>, Json(body): Json<Value>) -> Json<Value> {
    state.inputs.lock().push(body["input"].clone());
    match state.polls.fetch_add(1, Ordering::SeqCst) {
        0 => Json(json!({"ok": false, "error": {"message": "please reconnect", "statusCode": 408}})),
        1 => Json(json!({"ok": true, "data": [1, 2, 3]})),
        _ => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Json(json!({"ok": true, "data": []}))
        }
    }
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(3600)).await;
    Json(json!({"ok": true, "data": null}))
}

async fn serve(state: Arc<PollState>) -> String {
    let app = Router::new()
        .route("/rpc/poll", patch(poll))
        .route("/rpc/slow", get(slow))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/rpc", addr)
}

#[tokio::test]
async fn test_reconnect_then_data_over_http() {
    let state = Arc::new(PollState::default());
    let url = serve(state.clone()).await;
    let client = Client::builder(url).logging(false).build().unwrap();

    let (data_tx, mut data_rx) = mpsc::unbounded_channel();
    let errors = Arc::new(AtomicUsize::new(0));
    let error_count = errors.clone();
    let subscription = client.subscription(
        "poll",
        SubscriptionOptions::new(json!(0), |data: &Value| {
            Some(json!(data.as_array().map_or(0, |items| items.len())))
        })
        .on_data(move |data| {
            let _ = data_tx.send(data);
        })
        .on_error(move |_| {
            error_count.fetch_add(1, Ordering::SeqCst);
        }),
    );

    assert_eq!(data_rx.recv().await, Some(json!([1, 2, 3])));

    // Wait for the follow-up poll carrying the advanced cursor.
    while state.polls.load(Ordering::SeqCst) < 3 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    subscription.unsubscribe();
    tokio::time::timeout(Duration::from_secs(5), subscription.join())
        .await
        .unwrap();

    assert_eq!(errors.load(Ordering::SeqCst), 0);
    assert_eq!(*state.inputs.lock(), vec![json!(0), json!(0), json!(3)]);
    assert!(data_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_cancel_in_flight_query_over_http() {
    let url = serve(Arc::new(PollState::default())).await;
    let client = Client::builder(url).logging(false).build().unwrap();

    let request = client.query("slow", None);
    tokio::time::sleep(Duration::from_millis(50)).await;
    request.cancel();

    let err = tokio::time::timeout(Duration::from_secs(5), request)
        .await
        .unwrap()
        .unwrap_err();
    assert!(err.is_aborted());
}
