//! Outbound notifications and the worker that delivers them off the request
//! path.

use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use nesk_events::{EventBus, Notification, Subscription};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent,
    Skipped(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(String),
}

/// Delivers one notification.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<NotifyOutcome, NotifyError>;
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, notification: &Notification) -> Result<NotifyOutcome, NotifyError> {
        (**self).notify(notification)
    }
}

/// Notifier that writes deliveries to the log.
///
/// Without an API key email is disabled and every notification is skipped.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    from: String,
    enabled: bool,
}

impl LogNotifier {
    pub fn new(from: impl Into<String>, api_key: Option<&str>) -> Self {
        Self {
            from: from.into(),
            enabled: api_key.is_some_and(|k| !k.trim().is_empty()),
        }
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<NotifyOutcome, NotifyError> {
        if !self.enabled {
            return Ok(NotifyOutcome::Skipped("email sending is not configured".into()));
        }

        info!(
            from = %self.from,
            template = notification.kind.template_name(),
            ticket_id = %notification.ticket_id,
            "notification delivered"
        );
        Ok(NotifyOutcome::Sent)
    }
}

/// Handle to stop and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Drains notifications from the bus into a [`Notifier`].
#[derive(Debug)]
pub struct NotificationWorker;

impl NotificationWorker {
    /// Subscribe to `bus` and deliver on a dedicated thread.
    pub fn spawn<B, N>(bus: &B, notifier: N) -> io::Result<WorkerHandle>
    where
        B: EventBus<Notification>,
        N: Notifier + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub = bus.subscribe();

        let join = thread::Builder::new()
            .name("notification-worker".to_string())
            .spawn(move || worker_loop(sub, shutdown_rx, &notifier))?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop<N: Notifier>(
    sub: Subscription<Notification>,
    shutdown_rx: mpsc::Receiver<()>,
    notifier: &N,
) {
    let tick = Duration::from_millis(250);

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(notification) => deliver(notifier, &notification),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Deliver one notification, logging every non-`Sent` outcome.
pub fn deliver<N: Notifier + ?Sized>(notifier: &N, notification: &Notification) {
    match notifier.notify(notification) {
        Ok(NotifyOutcome::Sent) => {}
        Ok(NotifyOutcome::Skipped(reason)) => {
            info!(template = notification.kind.template_name(), %reason, "notification skipped");
        }
        Err(err) => {
            warn!(
                template = notification.kind.template_name(),
                error = %err,
                "notification failed"
            );
        }
    }
}
