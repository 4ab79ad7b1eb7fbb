use rent_scout::notify::{Notifier, TelegramNotifier};
use rent_scout::DeliveryError;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn notifier(server: &MockServer) -> TelegramNotifier {
    TelegramNotifier::with_api_base(server.uri(), "123:abc", Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_sends_markdown_message_to_chat() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .and(body_partial_json(json!({
            "chat_id": "-1001",
            "text": "*Price:* 1000000 \n",
            "parse_mode": "Markdown",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {}})))
        .expect(1)
        .mount(&server)
        .await;

    notifier(&server)
        .send("*Price:* 1000000 \n", "-1001")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_api_rejection_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "description": "Bad Request: chat not found",
        })))
        .mount(&server)
        .await;

    let err = notifier(&server).send("hola", "nobody").await.unwrap_err();
    match err {
        DeliveryError::Rejected(description) => assert!(description.contains("chat not found")),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_server_error_without_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = notifier(&server).send("hola", "-1001").await.unwrap_err();
    assert!(matches!(err, DeliveryError::Status(status) if status.as_u16() == 502));
}
