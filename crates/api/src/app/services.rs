//! Service wiring: data layer, sessions, audit trail, notification bus.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use nesk_auth::{Principal, SessionResolver};
use nesk_events::{EventBus, InMemoryEventBus, Notification};
use nesk_infra::{ActivityStore, AuditLog, DeskConfig, DeskStore, SessionRegistry, StoreResult};

use crate::app::errors::OpResult;

pub type Resolver = SessionResolver<Arc<SessionRegistry>, Arc<DeskStore>>;

/// Everything a guarded operation needs.
pub struct AppServices {
    pub store: Arc<DeskStore>,
    pub sessions: Arc<SessionRegistry>,
    pub resolver: Resolver,
    pub audit: AuditLog<Arc<dyn ActivityStore>>,
    pub bus: Arc<InMemoryEventBus<Notification>>,
    pub config: DeskConfig,
}

impl std::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppServices")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AppServices {
    /// In-memory services with the stock priorities and categories.
    pub fn in_memory(config: DeskConfig) -> StoreResult<Self> {
        let store = Arc::new(DeskStore::seeded()?);
        let activity: Arc<dyn ActivityStore> = store.clone();
        Ok(Self::from_parts(config, store, activity))
    }

    /// Wire services over an existing store and activity store.
    pub fn from_parts(
        config: DeskConfig,
        store: Arc<DeskStore>,
        activity: Arc<dyn ActivityStore>,
    ) -> Self {
        let sessions = Arc::new(SessionRegistry::new(config.session_ttl));
        Self {
            resolver: SessionResolver::new(sessions.clone(), store.clone()),
            store,
            sessions,
            audit: AuditLog::new(activity),
            bus: Arc::new(InMemoryEventBus::new()),
            config,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// Re-read the caller's role from the user record right before a
    /// mutation.
    pub fn refresh(&self, principal: &Principal) -> OpResult<Principal> {
        Ok(self.resolver.refresh(principal)?)
    }

    /// Hand a notification to the delivery worker. Never fails the caller.
    pub fn notify(&self, notification: Notification) {
        let template = notification.kind.template_name();
        if let Err(err) = self.bus.publish(notification) {
            warn!(template, error = %err, "failed to queue notification");
        }
    }
}
