//! Delivery channel tests against a mock Telegram API server.

use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use herald_common::types::EpisodePayload;
use herald_notifier::{Deliver, TelegramNotifier};

fn payload() -> EpisodePayload {
    EpisodePayload {
        show_title: "Fargo".to_string(),
        season_number: 5,
        episode_number: 3,
        episode_title: "Insolubilia".to_string(),
        url: "https://www.lostfilm.tv/series/Fargo/season_5/episode_3".to_string(),
    }
}

#[tokio::test]
async fn test_successful_send_yields_structured_outcome() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bot12345:token/sendMessage"))
        .and(body_partial_json(serde_json::json!({
            "chat_id": 777,
            "parse_mode": "HTML",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = TelegramNotifier::with_base_url("12345:token".to_string(), server.uri());
    let outcome = notifier.attempt(777, &payload()).await.unwrap();
    assert_eq!(outcome.status_code, 200);
}

#[tokio::test]
async fn test_api_failure_is_a_structured_status_not_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bot12345:token/sendMessage"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let notifier = TelegramNotifier::with_base_url("12345:token".to_string(), server.uri());
    // A 5xx from the API is an outcome for the retry schedule, not a
    // transport failure.
    let outcome = notifier.attempt(777, &payload()).await.unwrap();
    assert_eq!(outcome.status_code, 502);
}

#[tokio::test]
async fn test_unreachable_server_is_a_transport_error() {
    // A pooled server (`MockServer::start`) keeps listening after drop; a
    // bare one actually releases the port, making the address unreachable.
    let server = MockServer::builder().start().await;
    let uri = server.uri();
    drop(server);

    let notifier = TelegramNotifier::with_base_url("12345:token".to_string(), uri);
    let result = notifier.attempt(777, &payload()).await;
    assert!(result.is_err());
}
