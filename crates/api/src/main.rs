use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};

use nesk_api::{AppServices, build_app};
use nesk_infra::{DeskConfig, LogNotifier, NotificationWorker, SessionRegistry};

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    nesk_observability::init();

    let config = DeskConfig::from_env();
    let bind_addr = config.bind_addr.clone();
    let notifier = LogNotifier::new(
        config.support_email.clone(),
        config.resend_api_key.as_deref(),
    );

    let services =
        Arc::new(AppServices::in_memory(config).context("failed to seed the data layer")?);
    let worker = NotificationWorker::spawn(services.bus.as_ref(), notifier)
        .context("failed to start the notification worker")?;

    tokio::spawn(purge_sessions(services.sessions.clone()));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, build_app(services))
        .await
        .context("server error")?;

    worker.shutdown();
    Ok(())
}

/// Drop expired sessions so the registry does not grow without bound.
async fn purge_sessions(sessions: Arc<SessionRegistry>) {
    let mut tick = tokio::time::interval(SESSION_PURGE_INTERVAL);
    loop {
        tick.tick().await;
        match sessions.purge_expired(Utc::now()) {
            Ok(0) => {}
            Ok(purged) => info!(purged, "expired sessions purged"),
            Err(err) => warn!(error = %err, "session purge failed"),
        }
    }
}
