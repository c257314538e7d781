//! Webhook consent sync — forwards consent commands to an HTTP endpoint.
//!
//! Sinks only enqueue; a background worker does the HTTP calls, so a slow or
//! dead endpoint never holds up a visitor decision. The queue is bounded and
//! each request has a timeout; commands arriving while the queue is full are
//! dropped.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use consentry_protocol::{ConsentCommand, ConsentSignalSink};

/// Events waiting for delivery before new ones are dropped.
pub const SYNC_QUEUE_CAPACITY: usize = 1024;

/// Payload POSTed to the webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "visitorId")]
    pub visitor_id: String,
    #[serde(flatten)]
    pub command: ConsentCommand,
    pub sent_at: String,
}

/// Handle to the webhook worker's queue.
#[derive(Clone)]
pub struct WebhookQueue {
    tx: mpsc::Sender<WebhookEvent>,
}

impl WebhookQueue {
    fn channel(capacity: usize) -> (Self, mpsc::Receiver<WebhookEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// A sink that tags commands with `visitor_id`.
    pub fn sink_for(&self, visitor_id: &str) -> Arc<dyn ConsentSignalSink> {
        Arc::new(WebhookSink {
            visitor_id: visitor_id.to_string(),
            tx: self.tx.clone(),
        })
    }
}

struct WebhookSink {
    visitor_id: String,
    tx: mpsc::Sender<WebhookEvent>,
}

impl ConsentSignalSink for WebhookSink {
    fn is_available(&self) -> bool {
        !self.tx.is_closed()
    }

    fn send(&self, command: &ConsentCommand) {
        let event = WebhookEvent {
            visitor_id: self.visitor_id.clone(),
            command: command.clone(),
            sent_at: chrono::Utc::now().to_rfc3339(),
        };
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(
                    "Consent sync queue full, dropping {:?} for {}",
                    event.command.mode, event.visitor_id
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Webhook worker gone, dropping consent command");
            }
        }
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

/// Start the background worker posting consent events to `url`.
pub fn start_sync_worker(url: String, timeout: Duration) -> anyhow::Result<WebhookQueue> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build webhook client: {}", e))?;
    let (queue, mut rx) = WebhookQueue::channel(SYNC_QUEUE_CAPACITY);

    tokio::spawn(async move {
        info!("Consent sync worker started: {} (timeout {:?})", url, timeout);
        while let Some(event) = rx.recv().await {
            match client.post(&url).json(&event).send().await {
                Ok(resp) if resp.status().is_success() => {
                    debug!("Consent {:?} for {} delivered", event.command.mode, event.visitor_id);
                }
                Ok(resp) => {
                    warn!("Consent webhook returned {} for {}", resp.status(), event.visitor_id);
                }
                Err(e) => {
                    warn!("Consent webhook failed for {}: {}", event.visitor_id, e);
                }
            }
        }
    });

    Ok(queue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};
    use consentry_core::PreferenceSet;
    use consentry_protocol::{ConsentMode, SyncBridge};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_events_reach_webhook() {
        let received: Arc<Mutex<Vec<serde_json::Value>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_received = received.clone();
        let app = Router::new().route(
            "/consent",
            post(move |Json(body): Json<serde_json::Value>| {
                let sink_received = sink_received.clone();
                async move {
                    sink_received.lock().push(body);
                    "ok"
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let queue = start_sync_worker(format!("http://{}/consent", addr), Duration::from_secs(5)).unwrap();
        let bridge = SyncBridge::new(queue.sink_for("visitor-1"));
        bridge.push_default_denied();
        bridge.push_update(&PreferenceSet::all_granted());

        for _ in 0..100 {
            if received.lock().len() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let events = received.lock().clone();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["visitorId"], "visitor-1");
        assert_eq!(events[0]["type"], "default");
        assert_eq!(events[0]["signals"]["ad_storage"], "denied");
        assert_eq!(events[1]["type"], "update");
        assert_eq!(events[1]["command"], "consent");
        assert_eq!(events[1]["signals"]["analytics_storage"], "granted");
    }

    #[tokio::test]
    async fn test_unreachable_webhook_does_not_block() {
        let queue = start_sync_worker("http://127.0.0.1:9/consent".into(), Duration::from_secs(1)).unwrap();
        let sink = queue.sink_for("v");
        assert!(sink.is_available());
        sink.send(&ConsentCommand::new(
            ConsentMode::Update,
            (&PreferenceSet::default_deny()).into(),
        ));
    }

    #[tokio::test]
    async fn test_hung_webhook_does_not_stall_queue() {
        // Accepts connections and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                held.push(socket);
            }
        });

        let queue =
            start_sync_worker(format!("http://{}/consent", addr), Duration::from_millis(200)).unwrap();
        let bridge = SyncBridge::new(queue.sink_for("visitor-1"));
        bridge.push_default_denied();
        bridge.push_update(&PreferenceSet::all_granted());
        bridge.push_update(&PreferenceSet::default_deny());

        for _ in 0..100 {
            if accepted.load(Ordering::SeqCst) >= 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(accepted.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_full_queue_drops_commands() {
        let (queue, mut rx) = WebhookQueue::channel(1);
        let sink = queue.sink_for("v");
        let update = ConsentCommand::new(ConsentMode::Update, (&PreferenceSet::all_granted()).into());
        sink.send(&update);
        sink.send(&update);

        assert_eq!(rx.try_recv().unwrap().command, update);
        assert!(rx.try_recv().is_err());
        assert!(sink.is_available());
    }
}
