//! Staff ticket desk.

use serde::Serialize;
use tracing::info;

use nesk_auth::{Action, Principal, TicketAction};
use nesk_core::{CategoryId, PriorityId, TeamMemberId, TicketId};
use nesk_desk::{
    EntityType, NewActivity, ReplyInput, Ticket, TicketFilters, TicketReply, TicketStatus,
};
use nesk_events::Notification;
use nesk_infra::Table;

use super::{TicketView, parse_id, record};
use crate::app::errors::{OpError, OpResult};
use crate::app::services::AppServices;
use crate::authz::guard_role;
use crate::context::RequestContext;

/// Result of an update that may have been a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketUpdate {
    pub ticket: Ticket,
    pub changed: bool,
}

/// All tickets matching `filters`, newest activity first, each with its
/// public conversation.
pub fn list_tickets_for_staff(
    services: &AppServices,
    ctx: &RequestContext,
    filters: TicketFilters,
) -> OpResult<Vec<TicketView>> {
    let status = filters.status()?;
    guard_role(ctx.principal(), Action::Ticket(TicketAction::ReadAny))?;

    let public = Principal::anonymous();
    services
        .store
        .list_tickets(&filters, status)?
        .into_iter()
        .map(|ticket| {
            let replies = services.store.replies_visible_to(&ticket.id, &public)?;
            TicketView::build(services, ticket, replies)
        })
        .collect()
}

/// One ticket with every reply, internal notes included.
pub fn get_ticket_for_staff(
    services: &AppServices,
    ctx: &RequestContext,
    ticket_id: &str,
) -> OpResult<TicketView> {
    guard_role(ctx.principal(), Action::Ticket(TicketAction::ReadAny))?;
    let id: TicketId = parse_id(ticket_id)?;

    let ticket = services.store.tickets.get(&id)?.ok_or(OpError::NotFound)?;
    let replies = services.store.replies_visible_to(&id, ctx.principal())?;
    TicketView::build(services, ticket, replies)
}

pub fn update_ticket_status(
    services: &AppServices,
    ctx: &RequestContext,
    ticket_id: &str,
    status: &str,
) -> OpResult<TicketUpdate> {
    let status: TicketStatus = status.trim().parse()?;
    let mut previous = None;

    let update = mutate_ticket(services, ctx, TicketAction::UpdateStatus, ticket_id, |t, now| {
        previous = Some(t.status);
        t.set_status(status, now)
    })?;

    if let (true, Some(previous)) = (update.changed, previous) {
        record(
            services,
            ctx,
            ctx.principal(),
            NewActivity::new("update_status", EntityType::Ticket)
                .entity(update.ticket.id)
                .details(format!("Status changed from {previous} to {status}")),
        );
    }
    Ok(update)
}

pub fn update_ticket_priority(
    services: &AppServices,
    ctx: &RequestContext,
    ticket_id: &str,
    priority_id: Option<&str>,
) -> OpResult<TicketUpdate> {
    let priority: Option<PriorityId> = super::parse_ref("priority_id", priority_id)?;
    guard_role(ctx.principal(), Action::Ticket(TicketAction::UpdateAssignment))?;
    if let Some(id) = priority {
        services
            .store
            .priorities
            .get(&id)?
            .ok_or_else(|| OpError::validation("priority is invalid"))?;
    }

    let action = TicketAction::UpdateAssignment;
    let update = mutate_ticket(services, ctx, action, ticket_id, |t, now| {
        t.set_priority(priority, now)
    })?;

    if update.changed {
        record(
            services,
            ctx,
            ctx.principal(),
            NewActivity::new("update_priority", EntityType::Ticket).entity(update.ticket.id),
        );
    }
    Ok(update)
}

pub fn update_ticket_category(
    services: &AppServices,
    ctx: &RequestContext,
    ticket_id: &str,
    category_id: Option<&str>,
) -> OpResult<TicketUpdate> {
    let category: Option<CategoryId> = super::parse_ref("category_id", category_id)?;
    guard_role(ctx.principal(), Action::Ticket(TicketAction::UpdateAssignment))?;

    let update = services
        .store
        .with_category(category, || {
            mutate_ticket(services, ctx, TicketAction::UpdateAssignment, ticket_id, |t, now| {
                t.set_category(category, now)
            })
        })?
        .ok_or_else(|| OpError::validation("category is invalid"))?;

    if update.changed {
        record(
            services,
            ctx,
            ctx.principal(),
            NewActivity::new("update_category", EntityType::Ticket).entity(update.ticket.id),
        );
    }
    Ok(update)
}

pub fn assign_ticket(
    services: &AppServices,
    ctx: &RequestContext,
    ticket_id: &str,
    member_id: Option<&str>,
) -> OpResult<TicketUpdate> {
    let member: Option<TeamMemberId> = super::parse_ref("assigned_to", member_id)?;
    guard_role(ctx.principal(), Action::Ticket(TicketAction::UpdateAssignment))?;
    if let Some(id) = member {
        services
            .store
            .team
            .get(&id)?
            .ok_or_else(|| OpError::validation("assigned_to is invalid"))?;
    }

    let action = TicketAction::UpdateAssignment;
    let update = mutate_ticket(services, ctx, action, ticket_id, |t, now| {
        t.assign(member, now)
    })?;

    if update.changed {
        let details = match member {
            Some(id) => format!("Assigned to {id}"),
            None => "Unassigned".to_string(),
        };
        record(
            services,
            ctx,
            ctx.principal(),
            NewActivity::new("assign", EntityType::Ticket)
                .entity(update.ticket.id)
                .details(details),
        );
    }
    Ok(update)
}

/// Staff reply. Only staff may write internal notes; public replies notify
/// the ticket owner.
pub fn add_ticket_reply(
    services: &AppServices,
    ctx: &RequestContext,
    ticket_id: &str,
    input: ReplyInput,
) -> OpResult<TicketReply> {
    let message = input.validate()?;
    let action = if input.is_internal {
        TicketAction::ReplyInternal
    } else {
        TicketAction::ReplyPublic
    };

    let update = mutate_ticket(services, ctx, action, ticket_id, |t, now| {
        t.touch(now);
        true
    })?;
    let ticket = update.ticket;

    let author = ctx.principal().id().ok_or(OpError::Unauthorized)?;
    let reply =
        TicketReply::from_staff(ticket.id, author, message, input.is_internal, services.now());
    services.store.replies.insert(reply.clone())?;
    info!(ticket_id = %ticket.id, internal = reply.is_internal, "staff reply added");

    if !reply.is_internal {
        if let Some(owner) = services.store.users.get(&ticket.user_id)? {
            services.notify(Notification::ticket_updated(
                owner.email,
                ticket.id,
                &ticket.subject,
                &reply.message,
            ));
        }
    }

    Ok(reply)
}

/// Refresh the caller, authorize, then apply `change` under the ticket's
/// write lock. `change` returns whether anything changed.
fn mutate_ticket<F>(
    services: &AppServices,
    ctx: &RequestContext,
    action: TicketAction,
    ticket_id: &str,
    change: F,
) -> OpResult<TicketUpdate>
where
    F: FnOnce(&mut Ticket, chrono::DateTime<chrono::Utc>) -> bool,
{
    let principal = services.refresh(ctx.principal())?;
    guard_role(&principal, Action::Ticket(action))?;
    let id: TicketId = parse_id(ticket_id)?;
    let now = services.now();

    let update = services
        .store
        .tickets
        .modify(&id, |ticket: &mut Ticket| {
            let changed = change(ticket, now);
            Ok::<_, OpError>(TicketUpdate {
                ticket: ticket.clone(),
                changed,
            })
        })?
        .ok_or(OpError::NotFound)?;

    if update.changed {
        info!(ticket_id = %id, action = %Action::Ticket(action), "ticket updated");
    }
    Ok(update)
}
