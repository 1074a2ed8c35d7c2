#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;

use nesk_api::AppServices;
use nesk_api::app::ops::tickets;
use nesk_api::context::RequestContext;
use nesk_auth::{Principal, Role};
use nesk_core::{EmailAddress, TicketId};
use nesk_desk::{CreateTicketInput, UserAccount};
use nesk_infra::{DeskConfig, Table};

pub fn desk() -> Arc<AppServices> {
    Arc::new(AppServices::in_memory(DeskConfig::default()).expect("seed store"))
}

pub fn anonymous() -> RequestContext {
    RequestContext::for_principal(Principal::anonymous())
}

/// Persist an account with `role` and return a context signed in as it.
pub fn sign_up(services: &AppServices, email: &str, role: Role) -> (UserAccount, RequestContext) {
    let email = EmailAddress::parse(email).expect("valid email");
    let user = UserAccount::customer(email, Some("Test User".into()), Utc::now());
    services.store.users.insert(user.clone()).expect("insert user");
    services.store.set_user_role(&user.id, role).expect("set role");

    let principal = Principal::authenticated(user.id, user.email.clone(), role);
    let user = services.store.users.get(&user.id).unwrap().unwrap();
    (user, RequestContext::for_principal(principal))
}

/// Submit a ticket as a guest.
pub fn guest_ticket(services: &AppServices, name: &str, email: &str, subject: &str) -> TicketId {
    let input = CreateTicketInput {
        subject: subject.into(),
        message: "It does not work.".into(),
        name: Some(name.into()),
        email: Some(email.into()),
        ..Default::default()
    };
    tickets::create_ticket(services, &anonymous(), input)
        .expect("guest ticket")
        .ticket_id
}

pub fn activity_count(services: &AppServices) -> usize {
    services.store.activity.list().unwrap().len()
}
