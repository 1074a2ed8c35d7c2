use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use chrono::{Duration, Utc};
use nesk_auth::{Principal, Role};
use nesk_core::EmailAddress;
use nesk_desk::{Ticket, TicketFilters, TicketReply};
use nesk_infra::{DeskStore, Table};

fn populated(tickets: usize) -> DeskStore {
    let store = DeskStore::seeded().unwrap();
    let now = Utc::now();
    let priorities = store.priorities_by_level().unwrap();
    let owner = store
        .upsert_user_by_email(&EmailAddress::parse("bench@example.com").unwrap(), "Bench", now)
        .unwrap();

    for i in 0..tickets {
        let priority = &priorities[i % priorities.len()];
        let ticket = Ticket::open(
            owner.id,
            format!("Ticket number {i}"),
            None,
            Some(priority.id),
            now - Duration::minutes(i as i64),
        );
        store
            .replies
            .insert(TicketReply::from_staff(ticket.id, owner.id, "note".into(), i % 2 == 0, now))
            .unwrap();
        store.tickets.insert(ticket).unwrap();
    }
    store
}

fn bench_list_tickets(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_tickets");
    for size in [100usize, 1_000, 10_000] {
        let store = populated(size);
        let filters = TicketFilters {
            priority: Some("high".into()),
            search: Some("number 9".into()),
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(store.list_tickets(&filters, None).unwrap()))
        });
    }
    group.finish();
}

fn bench_visible_replies(c: &mut Criterion) {
    let store = populated(1_000);
    let ticket = store.tickets.list().unwrap().remove(0);
    let customer = Principal::anonymous();
    let staff = Principal::authenticated(
        nesk_core::UserId::new(),
        EmailAddress::parse("agent@example.com").unwrap(),
        Role::Staff,
    );

    c.bench_function("replies_visible_to/customer", |b| {
        b.iter(|| black_box(store.replies_visible_to(&ticket.id, &customer).unwrap()))
    });
    c.bench_function("replies_visible_to/staff", |b| {
        b.iter(|| black_box(store.replies_visible_to(&ticket.id, &staff).unwrap()))
    });
}

criterion_group!(benches, bench_list_tickets, bench_visible_replies);
criterion_main!(benches);
