//! Append-only activity trail.
//!
//! Recording is best-effort: [`AuditLog::record`] never fails the operation
//! that triggered it. A failed append is logged and dropped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::error;

use nesk_desk::{ActivityEntry, NewActivity};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    #[error("activity store unavailable: {0}")]
    Unavailable(String),
}

/// Storage for audit entries. There is no update or delete.
pub trait ActivityStore: Send + Sync {
    fn append(&self, entry: ActivityEntry) -> Result<(), AuditError>;

    /// Up to `limit` entries, newest first.
    fn recent(&self, limit: usize) -> Result<Vec<ActivityEntry>, AuditError>;
}

impl<S> ActivityStore for Arc<S>
where
    S: ActivityStore + ?Sized,
{
    fn append(&self, entry: ActivityEntry) -> Result<(), AuditError> {
        (**self).append(entry)
    }

    fn recent(&self, limit: usize) -> Result<Vec<ActivityEntry>, AuditError> {
        (**self).recent(limit)
    }
}

#[derive(Debug, Clone)]
pub struct AuditLog<S> {
    store: S,
}

impl<S: ActivityStore> AuditLog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Append an entry stamped with `now`. Errors are logged, not returned.
    pub fn record(&self, activity: NewActivity, now: DateTime<Utc>) {
        let entry = activity.into_entry(now);
        let action = entry.action.clone();
        let entity_type = entry.entity_type.as_str();

        if let Err(err) = self.store.append(entry) {
            error!(%action, entity_type, error = %err, "failed to record activity");
        }
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<ActivityEntry>, AuditError> {
        self.store.recent(limit)
    }
}
