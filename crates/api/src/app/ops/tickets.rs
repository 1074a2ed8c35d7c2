//! Customer-facing ticket operations.

use serde::Serialize;
use tracing::{debug, info};

use nesk_auth::{Action, Principal, ResourceDescriptor, TicketAction, authorize};
use nesk_core::TicketId;
use nesk_desk::{Category, CreateTicketInput, Priority, ReplyInput, Ticket, TicketReply};
use nesk_events::Notification;
use nesk_infra::Table;

use super::{TicketView, parse_id};
use crate::app::errors::{OpError, OpResult};
use crate::app::services::AppServices;
use crate::authz::guard;
use crate::context::RequestContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketCreated {
    pub ticket_id: TicketId,
}

/// Submit a ticket.
///
/// Guests must give a name and email; the ticket is owned by the account for
/// that email (created on first use). Signed-in callers own the ticket
/// themselves and any name/email in the form is ignored.
pub fn create_ticket(
    services: &AppServices,
    ctx: &RequestContext,
    input: CreateTicketInput,
) -> OpResult<TicketCreated> {
    let content = input.validate_content()?;
    let guest = if ctx.principal().is_anonymous() {
        Some(input.validate_guest()?)
    } else {
        None
    };

    let principal = services.refresh(ctx.principal())?;
    let action = if principal.is_anonymous() {
        TicketAction::CreateAsGuest
    } else {
        TicketAction::CreateAsSelf
    };
    guard(&principal, Action::Ticket(action), &ResourceDescriptor::none())?;

    let store = &services.store;
    if let Some(id) = input.priority_id {
        store.priorities.get(&id)?.ok_or_else(|| OpError::validation("priority is invalid"))?;
    }

    let now = services.now();
    let (ticket, owner_email) = store
        .with_category(input.category_id, || -> OpResult<_> {
            let (owner_id, owner_email) = match (&guest, principal.id(), principal.email()) {
                (_, Some(id), Some(email)) => (id, email.clone()),
                (Some((name, email)), _, _) => {
                    let user = store.upsert_user_by_email(email, name, now)?;
                    (user.id, user.email)
                }
                // A principal that lost its identity between validation and refresh.
                _ => return Err(OpError::Unauthorized),
            };

            let ticket =
                Ticket::open(owner_id, content.subject, input.category_id, input.priority_id, now);
            store.tickets.insert(ticket.clone())?;
            store
                .replies
                .insert(TicketReply::from_customer(ticket.id, owner_id, content.message, now))?;
            Ok((ticket, owner_email))
        })?
        .ok_or_else(|| OpError::validation("category is invalid"))?;
    let ticket_id = ticket.id;

    info!(%ticket_id, guest = guest.is_some(), "ticket created");
    services.notify(Notification::ticket_created(owner_email, ticket_id, &ticket.subject));

    Ok(TicketCreated { ticket_id })
}

/// Look up a ticket by id and owner email.
///
/// A wrong id and a wrong email produce the same `NotFound`. Internal notes
/// are never part of this view.
pub fn get_ticket_status(
    services: &AppServices,
    ctx: &RequestContext,
    ticket_id: &str,
    email: &str,
) -> OpResult<TicketView> {
    if email.trim().is_empty() {
        return Err(OpError::validation("email is required"));
    }

    let ticket =
        owned_ticket(services, ctx.principal(), TicketAction::ReadOwn, ticket_id, email)?;
    let replies = services
        .store
        .replies_visible_to(&ticket.id, &Principal::anonymous())?;

    TicketView::build(services, ticket, replies)
}

/// Post a public reply as the ticket's customer.
pub fn add_customer_reply(
    services: &AppServices,
    ctx: &RequestContext,
    ticket_id: &str,
    email: &str,
    input: ReplyInput,
) -> OpResult<TicketReply> {
    let message = input.validate()?;
    if email.trim().is_empty() {
        return Err(OpError::validation("email is required"));
    }

    let principal = services.refresh(ctx.principal())?;
    let id: TicketId = parse_id(ticket_id).map_err(|_| not_found())?;
    let store = &services.store;
    let now = services.now();

    let owner_id = store
        .tickets
        .modify(&id, |ticket: &mut Ticket| {
            let owner = store.users.get(&ticket.user_id)?.ok_or_else(not_found)?;
            let resource =
                ResourceDescriptor::owned(owner.id, owner.email, Some(email.to_string()));
            let reply = Action::Ticket(TicketAction::ReplyOwn);
            if !authorize(&principal, reply, &resource).is_allowed() {
                return Err(not_found());
            }
            ticket.touch(now);
            Ok(ticket.user_id)
        })?
        .ok_or_else(not_found)?;

    let reply = TicketReply::from_customer(id, owner_id, message, now);
    store.replies.insert(reply.clone())?;
    info!(ticket_id = %id, "customer reply added");

    Ok(reply)
}

pub fn list_categories(services: &AppServices) -> OpResult<Vec<Category>> {
    Ok(services.store.categories_by_name()?)
}

pub fn list_priorities(services: &AppServices) -> OpResult<Vec<Priority>> {
    Ok(services.store.priorities_by_level()?)
}

/// Load a ticket for an owner-scoped action. Every failure is `NotFound`.
fn owned_ticket(
    services: &AppServices,
    principal: &Principal,
    action: TicketAction,
    ticket_id: &str,
    email: &str,
) -> OpResult<Ticket> {
    let id: TicketId = parse_id(ticket_id).map_err(|_| not_found())?;
    let store = &services.store;

    let ticket = store.tickets.get(&id)?.ok_or_else(not_found)?;
    let owner = store.users.get(&ticket.user_id)?.ok_or_else(not_found)?;
    let resource = ResourceDescriptor::owned(owner.id, owner.email, Some(email.to_string()));

    if !authorize(principal, Action::Ticket(action), &resource).is_allowed() {
        return Err(not_found());
    }
    Ok(ticket)
}

fn not_found() -> OpError {
    debug!("owner-scoped ticket lookup did not match");
    OpError::NotFound
}
