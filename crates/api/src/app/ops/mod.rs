//! Guarded operations.
//!
//! Each operation takes the caller's [`RequestContext`] explicitly and runs
//! the same sequence: validate input, authorize, mutate, record activity,
//! hand off notifications. A denied or invalid call touches no data.

use std::str::FromStr;

use serde::Serialize;

use nesk_auth::Principal;
use nesk_core::{EmailAddress, UserId};
use nesk_desk::{NewActivity, Ticket, TicketReply};
use nesk_infra::Table;

use crate::app::errors::{OpError, OpResult};
use crate::app::services::AppServices;
use crate::context::RequestContext;

pub mod admin;
pub mod kb;
pub mod reports;
pub mod staff;
pub mod tickets;

/// Ticket owner as shown alongside a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerSummary {
    pub id: UserId,
    pub name: Option<String>,
    pub email: EmailAddress,
}

/// A ticket with its display names and conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketView {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub customer: Option<CustomerSummary>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub replies: Vec<TicketReply>,
}

impl TicketView {
    pub(crate) fn build(
        services: &AppServices,
        ticket: Ticket,
        replies: Vec<TicketReply>,
    ) -> OpResult<Self> {
        let store = &services.store;
        let customer = store.users.get(&ticket.user_id)?.map(|u| CustomerSummary {
            id: u.id,
            name: u.name,
            email: u.email,
        });
        let category = match ticket.category_id {
            Some(id) => store.categories.get(&id)?.map(|c| c.name),
            None => None,
        };
        let priority = match ticket.priority_id {
            Some(id) => store.priorities.get(&id)?.map(|p| p.name),
            None => None,
        };

        Ok(Self {
            ticket,
            customer,
            category,
            priority,
            replies,
        })
    }
}

/// Parse a record id from a path or form value. An unparseable id names no
/// record, so it reports `NotFound`.
pub(crate) fn parse_id<T: FromStr>(raw: &str) -> OpResult<T> {
    raw.trim().parse().map_err(|_| OpError::NotFound)
}

/// Parse an optional reference id from input. Unparseable ids are a
/// validation error naming the field.
pub(crate) fn parse_ref<T: FromStr>(field: &str, raw: Option<&str>) -> OpResult<Option<T>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| OpError::validation(format!("{field} is invalid"))),
    }
}

/// Append an activity entry for a completed mutation.
pub(crate) fn record(
    services: &AppServices,
    ctx: &RequestContext,
    actor: &Principal,
    activity: NewActivity,
) {
    services.audit.record(
        activity.actor(actor.id()).ip(ctx.ip_address()),
        services.now(),
    );
}
