//! Infrastructure layer: data layer, sessions, audit trail, notifications,
//! configuration.

pub mod audit;
pub mod config;
pub mod desk_store;
pub mod notify;
pub mod sessions;
pub mod store;

pub use audit::{ActivityStore, AuditError, AuditLog};
pub use config::DeskConfig;
pub use desk_store::{
    CategoryDependents, CategoryRemoval, CategoryUpdate, DashboardStats, DeskStore, TicketStats,
};
pub use notify::{
    LogNotifier, NotificationWorker, Notifier, NotifyError, NotifyOutcome, WorkerHandle, deliver,
};
pub use sessions::SessionRegistry;
pub use store::{InMemoryTable, StoreError, StoreResult, Table};
