//! Outbound notification messages and the bus that carries them.
//!
//! Operations publish a [`Notification`] and move on; a worker on the other
//! side of the bus does the actual delivery.

pub mod bus;
pub mod in_memory_bus;
pub mod notification;

pub use bus::{EventBus, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use notification::{Notification, NotificationKind};
