use common::{AggregateId, TenantId, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::invoice::{self, Invoice, InvoiceLine};
use events::EventEnvelope;
use futures_util::stream;
use projections::{
    Cache, HandlerRegistry, InMemoryCache, InMemoryReadModelStore, InvoiceProjection,
    ReadModelStore, replay,
};
use rust_decimal::Decimal;

use std::sync::Arc;

fn sample_line() -> InvoiceLine {
    InvoiceLine {
        id: "line-1".to_string(),
        description: "Widget".to_string(),
        quantity: 2,
        unit_price: Decimal::new(10000, 2),
        subtotal: Decimal::new(20000, 2),
        tax_amount: Decimal::new(3600, 2),
        total: Decimal::new(23600, 2),
    }
}

/// N invoices, each with 3 events (created + line added + sent).
fn invoice_events(n: usize) -> Vec<EventEnvelope> {
    let tenant = TenantId::new("tenant-bench");
    let user = UserId::new("user-bench");
    let mut events = Vec::with_capacity(n * 3);

    for i in 0..n {
        let id = AggregateId::new(format!("inv-{i}"));
        let invoice = Invoice {
            id: id.clone(),
            tenant_id: tenant.clone(),
            invoice_number: format!("INV-{i:05}"),
            client_id: AggregateId::new("client-1"),
            client_name: "Acme".to_string(),
            currency: "USD".to_string(),
            subtotal: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            total: Decimal::ZERO,
            due_date: None,
        };
        events.push(invoice::invoice_created(&invoice, user.clone()).unwrap());
        events.push(
            invoice::invoice_line_added(id.clone(), tenant.clone(), &sample_line(), user.clone())
                .unwrap()
                .with_version(2),
        );
        events.push(
            invoice::invoice_sent(id, tenant.clone(), "billing@acme.test", user.clone())
                .unwrap()
                .with_version(3),
        );
    }
    events
}

fn wired_registry() -> (HandlerRegistry, Arc<InMemoryReadModelStore>) {
    let store = Arc::new(InMemoryReadModelStore::new());
    let cache = Arc::new(InMemoryCache::new());
    let mut registry = HandlerRegistry::new();
    Arc::new(InvoiceProjection::new(
        store.clone() as Arc<dyn ReadModelStore>,
        cache as Arc<dyn Cache>,
    ))
    .register(&mut registry);
    (registry, store)
}

fn bench_dispatch_single_event(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (registry, _store) = wired_registry();
    let created = invoice_events(1).remove(0);

    c.bench_function("projections/dispatch_single_event", |b| {
        b.iter(|| {
            rt.block_on(async {
                let errors = registry.dispatch(&created).await;
                assert!(errors.is_empty());
            });
        });
    });
}

fn bench_replay_100_invoices(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (registry, store) = wired_registry();
    let events = invoice_events(100);

    c.bench_function("projections/replay_300_events", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.clear().await;
                let report = replay(&registry, stream::iter(events.clone())).await;
                assert_eq!(report.handler_errors, 0);
            });
        });
    });
}

fn bench_replay_1000_invoices(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (registry, store) = wired_registry();
    let events = invoice_events(1000);

    c.bench_function("projections/replay_3000_events", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.clear().await;
                let report = replay(&registry, stream::iter(events.clone())).await;
                assert_eq!(report.handler_errors, 0);
            });
        });
    });
}

criterion_group!(
    benches,
    bench_dispatch_single_event,
    bench_replay_100_invoices,
    bench_replay_1000_invoices,
);
criterion_main!(benches);
