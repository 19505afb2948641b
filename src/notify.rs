//! Alerting and activity logging towards the operations platform.

use crate::error::NotifyError;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Notice {
    Alert { category: String, body: String },
    Broadcast { title: String, message: String },
    LogActivity { message: String, event_name: String },
}

impl Notice {
    pub fn alert(category: impl Into<String>, body: impl Into<String>) -> Self {
        Notice::Alert {
            category: category.into(),
            body: body.into(),
        }
    }

    pub fn broadcast(title: impl Into<String>, message: impl Into<String>) -> Self {
        Notice::Broadcast {
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn activity(message: impl Into<String>, event_name: impl Into<String>) -> Self {
        Notice::LogActivity {
            message: message.into(),
            event_name: event_name.into(),
        }
    }
}

pub trait Notifier {
    fn send(&self, notice: Notice) -> BoxFuture<'_, Result<(), NotifyError>>;
}

/// Emits notices as structured log records.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, notice: Notice) -> BoxFuture<'_, Result<(), NotifyError>> {
        match &notice {
            Notice::Alert { category, body } => tracing::warn!(%category, %body, "alert"),
            Notice::Broadcast { title, message } => tracing::info!(%title, %message, "broadcast"),
            Notice::LogActivity {
                message,
                event_name,
            } => tracing::info!(event = %event_name, %message, "activity"),
        }
        futures::future::ready(Ok(())).boxed()
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    source: &'static str,
    host: Option<&'a str>,
    #[serde(flatten)]
    notice: &'a Notice,
}

/// Posts each notice as JSON to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    host: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .user_agent(format!("update-gate/{}", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        let host = std::fs::read_to_string("/etc/hostname")
            .ok()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty());
        Ok(Self {
            client,
            url: url.into(),
            host,
        })
    }
}

impl Notifier for WebhookNotifier {
    fn send(&self, notice: Notice) -> BoxFuture<'_, Result<(), NotifyError>> {
        async move {
            let payload = WebhookPayload {
                source: "update-gate",
                host: self.host.as_deref(),
                notice: &notice,
            };
            let resp = self.client.post(&self.url).json(&payload).send().await?;
            if !resp.status().is_success() {
                return Err(NotifyError::Status(resp.status()));
            }
            Ok(())
        }
        .boxed()
    }
}

/// Deliver `notice`, logging instead of failing when the sink is unavailable.
pub async fn deliver(notifier: &dyn Notifier, notice: Notice) {
    if let Err(e) = notifier.send(notice).await {
        tracing::warn!(error = %e, "notification delivery failed");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct RecordingNotifier {
        pub sent: Mutex<Vec<Notice>>,
    }

    impl RecordingNotifier {
        pub(crate) fn sent(&self) -> Vec<Notice> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn send(&self, notice: Notice) -> BoxFuture<'_, Result<(), NotifyError>> {
            self.sent.lock().unwrap().push(notice);
            futures::future::ready(Ok(())).boxed()
        }
    }

    #[test]
    fn webhook_payload_flattens_notice() {
        let notice = Notice::activity("Edge restarted", "RestartCompleted");
        let payload = WebhookPayload {
            source: "update-gate",
            host: Some("ws-042"),
            notice: &notice,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "source": "update-gate",
                "host": "ws-042",
                "op": "log_activity",
                "message": "Edge restarted",
                "event_name": "RestartCompleted",
            })
        );
    }

    #[tokio::test]
    async fn unreachable_webhook_does_not_fail_delivery() {
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/hook").unwrap();
        deliver(&notifier, Notice::alert("update", "test")).await;
    }
}
