//! Client side of the polling demo.
//!
//! Start `poll_server` first, then:
//!
//! Run with: cargo run --example poll_client

use rpc_router_client::{Client, SubscriptionOptions};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let client = Client::builder("http://127.0.0.1:4000/rpc")
        .on_error(|e| tracing::warn!(status = ?e.status_code(), "call failed: {e}"))
        .build()?;

    let user = client.query("getUser", Some(json!({"id": 1}))).await?;
    println!("getUser -> {user}");

    let cursor = Arc::new(AtomicU64::new(0));
    let seen = cursor.clone();
    let subscription = client.subscription(
        "messages",
        SubscriptionOptions::new(json!(0), move |batch: &Value| {
            let read = batch.as_array().map_or(0, |items| items.len()) as u64;
            Some(json!(seen.fetch_add(read, Ordering::SeqCst) + read))
        })
        .on_data(|batch| println!("messages -> {batch}"))
        .on_error(|e| eprintln!("poll failed: {e}")),
    );

    for text in ["hello", "from", "the demo"] {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let result = client.mutation("postMessage", Some(json!(text))).await?;
        println!("postMessage -> {result}");
    }

    tokio::time::sleep(Duration::from_secs(1)).await;
    subscription.unsubscribe();
    subscription.join().await;
    println!("read {} messages", cursor.load(Ordering::SeqCst));
    Ok(())
}
