//! Customer email notifications.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use nesk_core::{EmailAddress, TicketId};

/// Which template a notification renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TicketCreated,
    TicketUpdated,
}

impl NotificationKind {
    pub fn template_name(self) -> &'static str {
        match self {
            NotificationKind::TicketCreated => "ticket_created",
            NotificationKind::TicketUpdated => "ticket_updated",
        }
    }
}

/// A message to one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub to: EmailAddress,
    pub kind: NotificationKind,
    pub ticket_id: TicketId,
    /// Template variables.
    pub data: Value,
}

impl Notification {
    pub fn ticket_created(to: EmailAddress, ticket_id: TicketId, subject: &str) -> Self {
        Self {
            to,
            kind: NotificationKind::TicketCreated,
            ticket_id,
            data: serde_json::json!({
                "ticketId": ticket_id.to_string(),
                "subject": subject,
            }),
        }
    }

    pub fn ticket_updated(
        to: EmailAddress,
        ticket_id: TicketId,
        subject: &str,
        message: &str,
    ) -> Self {
        Self {
            to,
            kind: NotificationKind::TicketUpdated,
            ticket_id,
            data: serde_json::json!({
                "ticketId": ticket_id.to_string(),
                "subject": subject,
                "message": message,
            }),
        }
    }
}
