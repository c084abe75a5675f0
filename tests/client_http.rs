//! Wire contract of the default reqwest transport, checked against mockito.

use http::{HeaderMap, HeaderValue};
use mockito::Matcher;
use rpc_router_client::{Client, TransportError};
use serde_json::json;

fn client_for(server: &mockito::ServerGuard) -> Client {
    Client::builder(format!("{}/rpc", server.url()))
        .headers(|| {
            let mut headers = HeaderMap::new();
            headers.insert("authorization", HeaderValue::from_static("Bearer test"));
            headers
        })
        .logging(false)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_query_sends_get_with_encoded_input() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/rpc/getUser")
        .match_query(Matcher::UrlEncoded("input".into(), r#"{"id":1}"#.into()))
        .match_header("content-type", "application/json")
        .match_header("authorization", "Bearer test")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok":true,"data":{"id":1,"name":"A"}}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let user = client.query("getUser", Some(json!({"id": 1}))).await.unwrap();

    assert_eq!(user, json!({"id": 1, "name": "A"}));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_mutation_sends_post_body_and_ignores_http_status() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/rpc/createUser")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({"input": {"name": "B"}})))
        .with_status(409)
        .with_body(r#"{"ok":false,"error":{"message":"conflict","statusCode":409,"field":"name"}}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .mutation("createUser", Some(json!({"name": "B"})))
        .await
        .unwrap_err();

    assert_eq!(err.message(), "conflict");
    let shape = err.shape().unwrap();
    assert_eq!(shape.status_code, Some(409));
    assert_eq!(shape.extra["field"], "name");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_envelope_on_success_status() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/rpc/validate")
        .with_status(200)
        .with_body(r#"{"ok":false,"error":{"message":"invalid input"}}"#)
        .create_async()
        .await;

    let err = client_for(&server)
        .mutation("validate", None)
        .await
        .unwrap_err();
    assert_eq!(err.message(), "invalid input");
    assert_eq!(err.status_code(), None);
}

#[tokio::test]
async fn test_subscription_poll_uses_patch() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PATCH", "/rpc/poll")
        .match_body(Matcher::Json(json!({"input": 0})))
        .with_body(r#"{"ok":true,"data":[1,2,3]}"#)
        .create_async()
        .await;

    let data = client_for(&server)
        .subscription_once("poll", Some(json!(0)))
        .await
        .unwrap();
    assert_eq!(data, json!([1, 2, 3]));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_non_json_body_is_transport_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/rpc/health")
        .with_status(502)
        .with_body("<html>Bad Gateway</html>")
        .create_async()
        .await;

    let err = client_for(&server).query("health", None).await.unwrap_err();
    assert!(matches!(err.transport(), Some(TransportError::Decode(_))));
    assert!(err.envelope().is_none());
}

#[tokio::test]
async fn test_connection_failure_is_transport_error() {
    let client = Client::builder("http://127.0.0.1:9/rpc")
        .logging(false)
        .build()
        .unwrap();

    let err = client.query("anything", None).await.unwrap_err();
    assert!(matches!(err.transport(), Some(TransportError::Http(_))));
}
