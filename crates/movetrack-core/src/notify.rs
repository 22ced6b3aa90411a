//! Outbound notifications to clients, agents and coordinators.
//!
//! Notifications are queued after a transition has been committed and sent
//! from a background worker. Delivery is best effort: failures are logged and
//! never reach the caller.

use crate::error::{Result, TrackError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    Client,
    Agent,
    Coordinator,
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Audience::Client => "client",
            Audience::Agent => "agent",
            Audience::Coordinator => "coordinator",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub move_id: Uuid,
    pub audience: Audience,
    /// Template name the channel renders, e.g. `milestone_completed`.
    pub template: String,
    pub payload: serde_json::Value,
}

pub trait Notifier: Send + Sync {
    fn send(&self, notification: &Notification) -> Result<()>;
}

// ---------------------------------------------------------------------------
// LogNotifier
// ---------------------------------------------------------------------------

/// Writes every notification to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, n: &Notification) -> Result<()> {
        tracing::info!(
            move_id = %n.move_id,
            audience = %n.audience,
            template = %n.template,
            "notification"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// WebhookNotifier
// ---------------------------------------------------------------------------

/// POSTs each notification as JSON to a fixed URL.
pub struct WebhookNotifier {
    url: String,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    fn unavailable(reason: impl fmt::Display) -> TrackError {
        TrackError::CollaboratorUnavailable {
            collaborator: "notification channel".to_string(),
            reason: reason.to_string(),
        }
    }
}

impl Notifier for WebhookNotifier {
    fn send(&self, n: &Notification) -> Result<()> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(Self::unavailable)?;
        let resp = client
            .post(&self.url)
            .json(n)
            .send()
            .map_err(Self::unavailable)?;
        if !resp.status().is_success() {
            return Err(Self::unavailable(format!(
                "POST {} returned {}",
                self.url,
                resp.status()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

enum Job {
    Send(Notification),
    Flush(mpsc::Sender<()>),
}

/// Queue drained by a worker thread that owns the [`Notifier`]. Enqueueing
/// never waits on delivery. Dropping the dispatcher drains what is queued and
/// joins the worker.
pub struct Dispatcher {
    tx: Mutex<Option<mpsc::Sender<Job>>>,
    worker: Option<JoinHandle<()>>,
}

impl Dispatcher {
    pub fn spawn(notifier: Arc<dyn Notifier>) -> Self {
        let (tx, rx) = mpsc::channel::<Job>();
        let worker = std::thread::spawn(move || {
            for job in rx {
                match job {
                    Job::Send(n) => {
                        if let Err(e) = notifier.send(&n) {
                            tracing::warn!(
                                move_id = %n.move_id,
                                template = %n.template,
                                error = %e,
                                "notification failed"
                            );
                        }
                    }
                    Job::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });
        Self {
            tx: Mutex::new(Some(tx)),
            worker: Some(worker),
        }
    }

    fn submit(&self, job: Job) -> bool {
        match self.tx.lock() {
            Ok(guard) => guard.as_ref().is_some_and(|tx| tx.send(job).is_ok()),
            Err(_) => false,
        }
    }

    pub fn enqueue(&self, n: Notification) {
        let template = n.template.clone();
        if !self.submit(Job::Send(n)) {
            tracing::warn!(template = %template, "notification dropped: dispatcher is not running");
        }
    }

    /// Block until every notification queued before this call was handled.
    pub fn flush(&self) {
        let (done_tx, done_rx) = mpsc::channel();
        if self.submit(Job::Flush(done_tx)) {
            let _ = done_rx.recv();
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.tx.lock() {
            guard.take();
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Notification {
        Notification {
            move_id: Uuid::new_v4(),
            audience: Audience::Client,
            template: "milestone_completed".into(),
            payload: serde_json::json!({"kind": "packing"}),
        }
    }

    #[test]
    fn log_notifier_never_fails() {
        assert!(LogNotifier.send(&sample()).is_ok());
    }

    struct Slow {
        delay: Duration,
        sent: Mutex<Vec<String>>,
    }

    impl Notifier for Slow {
        fn send(&self, n: &Notification) -> Result<()> {
            std::thread::sleep(self.delay);
            self.sent.lock().unwrap().push(n.template.clone());
            Err(TrackError::CollaboratorUnavailable {
                collaborator: "notification channel".into(),
                reason: "timeout".into(),
            })
        }
    }

    #[test]
    fn dispatcher_enqueue_does_not_wait_for_delivery() {
        let slow = Arc::new(Slow {
            delay: Duration::from_millis(300),
            sent: Mutex::new(Vec::new()),
        });
        let dispatcher = Dispatcher::spawn(slow.clone());

        let started = std::time::Instant::now();
        dispatcher.enqueue(sample());
        dispatcher.enqueue(sample());
        assert!(started.elapsed() < Duration::from_millis(100));

        dispatcher.flush();
        assert_eq!(slow.sent.lock().unwrap().len(), 2);
    }

    #[test]
    fn webhook_posts_json() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/hook")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "audience": "client",
                "template": "milestone_completed"
            })))
            .with_status(204)
            .create();

        let notifier = WebhookNotifier::new(format!("{}/hook", server.url()), Duration::from_secs(2));
        notifier.send(&sample()).unwrap();
        mock.assert();
    }

    #[test]
    fn webhook_error_status_is_unavailable() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("POST", "/hook").with_status(500).create();
        let notifier = WebhookNotifier::new(format!("{}/hook", server.url()), Duration::from_secs(2));
        assert!(matches!(
            notifier.send(&sample()),
            Err(TrackError::CollaboratorUnavailable { .. })
        ));
    }
}
