//! Benchmarks for the resource policy engine.
//!
//! Run with: `cargo bench --package nesk-auth`

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use nesk_auth::{
    Action, AdminAction, Principal, ResourceDescriptor, Role, TicketAction, authorize,
};
use nesk_core::{EmailAddress, UserId};

fn bench_authorize(c: &mut Criterion) {
    let email = EmailAddress::parse("jane@example.com").unwrap();
    let user = Principal::authenticated(UserId::new(), email.clone(), Role::User);
    let admin = Principal::authenticated(UserId::new(), email.clone(), Role::Admin);
    let owned =
        ResourceDescriptor::owned(UserId::new(), email, Some("Jane@Example.com".into()));

    c.bench_function("authorize_read_own", |b| {
        b.iter(|| {
            authorize(
                black_box(&user),
                Action::Ticket(TicketAction::ReadOwn),
                black_box(&owned),
            )
        })
    });

    c.bench_function("authorize_admin_crud", |b| {
        b.iter(|| {
            authorize(
                black_box(&admin),
                Action::Category(AdminAction::Delete),
                black_box(&ResourceDescriptor::none()),
            )
        })
    });
}

criterion_group!(benches, bench_authorize);
criterion_main!(benches);
