//! End-to-end flows across both crates against a mock solver.

use futures::StreamExt;
use safecrack_client::{
    ClientConfig, CrackError, Phase, Progress, SafeCracker, Session, Settlement, StreamEvent,
};
use safecrack_types::{ApiKey, Completion, TransportError};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "dev-safe-cracker-key-12345";

fn progress_line(attempts: u64, current: &str, correct: u32) -> String {
    serde_json::json!({
        "type": "progress",
        "attempts": attempts,
        "current_attempt": current,
        "correct_digits": correct,
        "total_digits": current.len(),
    })
    .to_string()
}

fn complete_line(attempts: u64, time_taken: f64) -> String {
    serde_json::json!({ "type": "complete", "attempts": attempts, "time_taken": time_taken })
        .to_string()
}

/// Solver that accepts only `KEY` and streams a fixed run.
async fn solver() -> MockServer {
    let server = MockServer::start().await;

    let body = [
        progress_line(10, "0000000000", 1),
        progress_line(20, "0800000000", 2),
        progress_line(30, "0806000000", 4),
        complete_line(42, 3.5),
    ]
    .join("\n")
        + "\n";

    Mock::given(method("POST"))
        .and(path("/api/crack_safe/stream"))
        .and(header("X-API-Key", KEY))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/x-ndjson")
                .set_body_string(body),
        )
        .mount(&server)
        .await;

    // Anything without the right key.
    Mock::given(method("POST"))
        .and(path("/api/crack_safe/stream"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({ "error": "Unauthorized: Invalid API key" })),
        )
        .with_priority(10)
        .mount(&server)
        .await;

    server
}

#[tokio::test]
async fn progress_reports_arrive_in_order_before_completion() {
    let server = solver().await;
    let config = ClientConfig {
        base_url: server.uri(),
        ..ClientConfig::default()
    };
    let client = SafeCracker::with_config(&config, ApiKey::new(KEY)).unwrap();

    let mut reports: Vec<Progress> = Vec::new();
    let done = client
        .stream_crack("0806666612", |p: Progress| reports.push(p))
        .await
        .unwrap();

    let attempts: Vec<u64> = reports.iter().map(|p| p.attempts).collect();
    assert_eq!(attempts, vec![10, 20, 30]);
    assert!(reports.windows(2).all(|w| w[0].correct_digits <= w[1].correct_digits));
    assert_eq!(reports[2].fraction_correct(), 0.4);
    assert_eq!(
        done,
        Completion {
            attempts: 42,
            time_taken: 3.5
        }
    );
}

#[tokio::test]
async fn one_client_serves_sequential_operations() {
    let server = solver().await;
    let client = SafeCracker::new().base_url(server.uri()).api_key(KEY);

    for _ in 0..3 {
        let mut calls = 0;
        let done = client
            .stream_crack("0806666612", |_: Progress| calls += 1)
            .await
            .unwrap();
        assert_eq!(calls, 3);
        assert_eq!(done.attempts, 42);
    }
}

#[tokio::test]
async fn concurrent_operations_do_not_share_state() {
    let server = solver().await;
    let client = SafeCracker::new().base_url(server.uri()).api_key(KEY);

    let (a, b) = tokio::join!(
        client.stream_crack("0806666612", |_: Progress| {}),
        client.crack_events("0806666612"),
    );
    assert_eq!(a.unwrap().attempts, 42);

    let events: Vec<_> = b.unwrap().receiver.collect().await;
    assert_eq!(events.len(), 4);
    assert!(matches!(events.last(), Some(Ok(StreamEvent::Complete(c))) if c.attempts == 42));
}

#[tokio::test]
async fn wrong_key_settles_once_with_status_only() {
    let server = solver().await;
    let client = SafeCracker::new().base_url(server.uri()).api_key("wrong");

    let mut calls = 0;
    let err = client
        .stream_crack("0806666612", |_: Progress| calls += 1)
        .await
        .unwrap_err();

    assert_eq!(calls, 0);
    assert!(matches!(
        &err,
        CrackError::Transport(TransportError::Status { status: 401, body }) if body.is_empty()
    ));
}

#[tokio::test]
async fn cancel_midway_stops_reporting() {
    let server = solver().await;
    let client = SafeCracker::new().base_url(server.uri()).api_key(KEY);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let mut calls = 0;
    let result = client
        .stream_crack_with_cancel(
            "0806666612",
            |_: Progress| {
                calls += 1;
                trigger.cancel();
            },
            &cancel,
        )
        .await;

    // The whole body arrives as one chunk, so every framed line is still
    // dispatched and the completion wins.
    match result {
        Ok(done) => {
            assert_eq!(calls, 3);
            assert_eq!(done.attempts, 42);
        }
        Err(e) => {
            assert!(matches!(e, CrackError::Cancelled), "unexpected: {e:?}");
            assert!(calls >= 1);
        }
    }
}

#[test]
fn session_walks_the_happy_path() {
    let mut session = Session::new();
    assert_eq!(session.phase(), Phase::Idle);
    session.advance(Phase::Connecting);
    session.advance(Phase::Streaming);
    let done = session.settle(Ok(Completion {
        attempts: 1,
        time_taken: 0.0,
    }));
    assert!(done.is_ok());
    assert_eq!(session.phase(), Phase::Settled(Settlement::Success));
}
