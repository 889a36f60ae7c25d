use std::sync::mpsc;
use std::time::Duration;

use listing_core::TaskStatus;
use listing_engine::{
    decode_event, subscribe, ApiClient, ChannelStreamHandler, ClientSettings, EngineEvent,
    FailureKind, StreamItem,
};
use pretty_assertions::assert_eq;
use tokio::runtime::Handle;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TASK: &str = r#"{"id":"job-1","name":"Refresh","type":"ACTUALIZE_BY_ID","status":"completed","created_at":"2025-03-01T12:00:00Z","finished_at":"2025-03-01T12:01:00Z","result_summary":{"id":"obj-1"}}"#;

fn client_for(server: &MockServer, token: Option<&str>) -> ApiClient {
    let settings = ClientSettings {
        api_url: format!("{}/api/v1/", server.uri()),
        ..ClientSettings::default()
    };
    ApiClient::new(&settings, token.map(str::to_string)).expect("valid settings")
}

async fn sse_server(status: u16, body: String) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tasks/subscribe"))
        .and(header("accept", "text/event-stream"))
        .respond_with(
            ResponseTemplate::new(status)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(&server)
        .await;
    server
}

/// Collects events until the stream reports failure or the deadline passes.
async fn collect_until_failed(rx: &mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    for _ in 0..200 {
        while let Ok(event) = rx.try_recv() {
            let done = matches!(event, EngineEvent::StreamFailed(_));
            events.push(event);
            if done {
                return events;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    events
}

#[test]
fn connected_event_is_recognised_by_name() {
    assert_eq!(decode_event("connected", "{}"), StreamItem::Connected);
    assert_eq!(decode_event("task_updated", ""), StreamItem::Empty);
    assert!(matches!(
        decode_event("task_updated", "{not json"),
        StreamItem::Malformed(_)
    ));
    match decode_event("task_created", TASK) {
        StreamItem::Task(task) => assert_eq!(task.id, "job-1"),
        other => panic!("expected a task, got {other:?}"),
    }
    // Unnamed events default to "message" and still carry tasks.
    assert!(matches!(decode_event("message", TASK), StreamItem::Task(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn stream_delivers_connect_and_tasks_then_reports_end() {
    let body = format!(
        "event: connected\ndata: {{}}\n\nevent: task_updated\ndata: {{broken\n\nevent: task_updated\ndata: {TASK}\n\n"
    );
    let server = sse_server(200, body).await;
    let (tx, rx) = mpsc::channel();

    let subscription = subscribe(
        &Handle::current(),
        &client_for(&server, None),
        ChannelStreamHandler::new(tx),
    );
    let events = collect_until_failed(&rx).await;

    assert_eq!(events.len(), 3, "{events:?}");
    assert_eq!(events[0], EngineEvent::StreamConnected);
    match &events[1] {
        EngineEvent::TaskPushed(task) => {
            assert_eq!(task.status, TaskStatus::Completed);
            assert_eq!(task.target_object_id(), Some("obj-1"));
        }
        other => panic!("expected a task, got {other:?}"),
    }
    match &events[2] {
        EngineEvent::StreamFailed(err) => assert_eq!(err.kind, FailureKind::StreamClosed),
        other => panic!("expected failure, got {other:?}"),
    }
    drop(subscription);
}

#[tokio::test(flavor = "multi_thread")]
async fn stream_sends_credential_when_present() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tasks/subscribe"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string("event: connected\ndata: {}\n\n"),
        )
        .expect(1)
        .mount(&server)
        .await;
    let (tx, rx) = mpsc::channel();

    let _subscription = subscribe(
        &Handle::current(),
        &client_for(&server, Some("tok-1")),
        ChannelStreamHandler::new(tx),
    );
    let events = collect_until_failed(&rx).await;
    assert_eq!(events.first(), Some(&EngineEvent::StreamConnected));
}

#[tokio::test(flavor = "multi_thread")]
async fn refused_stream_fails_without_connecting() {
    let server = sse_server(401, String::new()).await;
    let (tx, rx) = mpsc::channel();

    let _subscription = subscribe(
        &Handle::current(),
        &client_for(&server, None),
        ChannelStreamHandler::new(tx),
    );
    let events = collect_until_failed(&rx).await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        EngineEvent::StreamFailed(err) => assert_eq!(err.kind, FailureKind::Unauthorized),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn unsubscribed_stream_stays_silent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tasks/subscribe"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_delay(Duration::from_millis(200))
                .set_body_string(format!("event: task_created\ndata: {TASK}\n\n")),
        )
        .mount(&server)
        .await;
    let (tx, rx) = mpsc::channel();

    let subscription = subscribe(
        &Handle::current(),
        &client_for(&server, None),
        ChannelStreamHandler::new(tx),
    );
    subscription.unsubscribe();
    subscription.unsubscribe();
    assert!(!subscription.is_active());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(rx.try_recv().is_err());
}
