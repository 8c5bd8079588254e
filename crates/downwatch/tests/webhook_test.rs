//! Webhook delivery against a local HTTP sink

use axum::{Json, Router, extract::State, http::HeaderMap, http::StatusCode, routing::post};
use chrono::{TimeZone, Utc};
use downwatch::{Endpoint, MetricsRegistry, Notification, NotificationKind, Notify, WebhookNotifier};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Clone)]
struct Sink {
    status: StatusCode,
    received: Arc<Mutex<Vec<(String, Value)>>>,
}

async fn receive(State(sink): State<Sink>, headers: HeaderMap, Json(body): Json<Value>) -> StatusCode {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    sink.received.lock().unwrap().push((content_type, body));
    sink.status
}

/// Start a sink answering with `status`; returns its URL and captured requests
async fn start_sink(status: StatusCode) -> (String, Arc<Mutex<Vec<(String, Value)>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Sink {
        status,
        received: received.clone(),
    };
    let app = Router::new().route("/hook", post(receive)).with_state(sink);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/hook", addr), received)
}

fn outage() -> Notification {
    Notification::outage(
        Utc.with_ymd_and_hms(2024, 1, 1, 8, 30, 0).unwrap(),
        Endpoint::new("zoomhash.io", 80),
    )
}

#[tokio::test]
async fn test_webhook_posts_text_payload() {
    let (url, received) = start_sink(StatusCode::OK).await;
    let metrics = Arc::new(MetricsRegistry::new());
    let notifier = WebhookNotifier::new(url, Duration::from_secs(5), Some(metrics.clone())).unwrap();

    notifier.notify(&outage()).await;

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    let (content_type, body) = &received[0];
    assert_eq!(content_type, "application/json");
    assert_eq!(
        body["text"],
        "2024-01-01 08:30:00.000000 -- Outage detected at zoomhash.io (port: 80)"
    );
    assert_eq!(body.as_object().unwrap().len(), 1);
    assert_eq!(metrics.notifications(NotificationKind::Outage, "sent"), 1);
}

#[tokio::test]
async fn test_webhook_error_status_is_counted_not_raised() {
    let (url, received) = start_sink(StatusCode::INTERNAL_SERVER_ERROR).await;
    let metrics = Arc::new(MetricsRegistry::new());
    let notifier = WebhookNotifier::new(url, Duration::from_secs(5), Some(metrics.clone())).unwrap();

    notifier.notify(&outage()).await;

    assert_eq!(received.lock().unwrap().len(), 1);
    assert_eq!(metrics.notifications(NotificationKind::Outage, "failed"), 1);
    assert_eq!(metrics.notifications(NotificationKind::Outage, "sent"), 0);
}
