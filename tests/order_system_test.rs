use std::sync::Arc;
use std::time::Duration;

use order_telemetry::config::Config;
use order_telemetry::fault::ScriptedFaults;
use order_telemetry::lifecycle::{try_setup_tracing, OrderSystem};
use order_telemetry::model::{OrderRequest, OrderStatus};
use order_telemetry::pipeline::{
    PipelineStep, CREATE_ORDER_SPAN, IN_FLIGHT_GAUGE, PROCESSED_COUNTER,
    PROCESSING_TIME_HISTOGRAM,
};
use order_telemetry::service::{Reply, GET_ORDER_SPAN, HEALTH_SPAN, LIST_ORDERS_SPAN};
use order_telemetry::telemetry::{InMemoryExporter, SpanStatus, Telemetry};
use pretty_assertions::assert_eq;

fn system_with(faults: &ScriptedFaults) -> (OrderSystem, InMemoryExporter) {
    let _ = try_setup_tracing();
    let (telemetry, exporter) = Telemetry::in_memory();
    let system = OrderSystem::with_faults(&Config::default(), telemetry, Arc::new(faults.clone()));
    (system, exporter)
}

fn processed(system: &OrderSystem, status: &str) -> u64 {
    system
        .telemetry()
        .metrics()
        .counter(PROCESSED_COUNTER, "", "")
        .value(&[("status", status)])
}

/// Forced success: a confirmed order, exactly one success increment, no error increment.
#[tokio::test(start_paused = true)]
async fn test_forced_success_confirms_and_stores_the_order() {
    let faults = ScriptedFaults::new();
    for step in PipelineStep::ALL {
        faults
            .expect(step.as_str())
            .succeed_after(Duration::from_millis(30));
    }
    let (system, exporter) = system_with(&faults);

    let reply = system
        .service
        .create_order(OrderRequest::with_amount(99.999))
        .await;
    assert_eq!(reply.status_code(), 201);
    let order = reply.into_body().expect("created order");
    assert_eq!(order.status, OrderStatus::Confirmed);
    assert_eq!(order.amount, 100.0);
    faults.verify();

    assert_eq!(processed(&system, "success"), 1);
    assert_eq!(processed(&system, "error"), 0);

    let fetched = system.service.get_order(&order.id.to_string()).await;
    assert_eq!(fetched, Reply::Ok(order.clone()));

    let roots = exporter.roots();
    let create = roots
        .iter()
        .find(|s| s.name == CREATE_ORDER_SPAN)
        .expect("create-order root span");
    assert_eq!(create.status, SpanStatus::Ok);
    assert_eq!(exporter.by_trace(create.trace_id).len(), 5);
    // Step spans cover exactly their simulated delay on the runtime clock.
    for step in exporter.by_trace(create.trace_id).iter().filter(|s| !s.is_root()) {
        assert_eq!(step.duration(), Some(chrono::Duration::milliseconds(30)));
    }

    system.shutdown().await.expect("shutdown");
}

/// Forced payment failure: nothing stored, one error increment, root span in ERROR.
#[tokio::test(start_paused = true)]
async fn test_forced_payment_failure_stores_nothing() {
    let faults = ScriptedFaults::new();
    faults.expect("check_inventory").succeed();
    faults.expect("insert_order").succeed();
    faults
        .expect("process_payment")
        .fail_after(Duration::from_millis(200));
    let (system, exporter) = system_with(&faults);

    let reply = system.service.create_order(OrderRequest::default()).await;
    assert_eq!(reply.status_code(), 500);
    let body = reply.error().expect("error body");
    assert_eq!(body.code, "PAYMENT_DECLINED");
    assert_eq!(body.error, "Payment declined");
    faults.verify();

    assert_eq!(processed(&system, "error"), 1);
    assert_eq!(processed(&system, "success"), 0);

    let listed = system.service.list_orders().await;
    assert_eq!(listed, Reply::Ok(Vec::new()));

    let root = exporter
        .roots()
        .into_iter()
        .find(|s| s.name == CREATE_ORDER_SPAN)
        .expect("create-order root span");
    assert_eq!(
        root.status,
        SpanStatus::Error {
            message: "Payment declined".into()
        }
    );
    let children: Vec<_> = exporter
        .by_trace(root.trace_id)
        .into_iter()
        .filter(|s| !s.is_root())
        .collect();
    assert_eq!(children.len(), 3, "update_order_status must not run");
    assert!(children.last().map(|s| s.status.is_error()).unwrap_or(false));

    system.shutdown().await.expect("shutdown");
}

/// Listing returns every created order; an unknown id is not-found and leaves the store alone.
#[tokio::test]
async fn test_list_and_get_orders() {
    let faults = ScriptedFaults::always_succeed();
    let (system, exporter) = system_with(&faults);

    let a = system
        .service
        .create_order(OrderRequest::with_amount(12.5))
        .await
        .into_body()
        .expect("order A");
    let b = system
        .service
        .create_order(OrderRequest::with_amount(300.0))
        .await
        .into_body()
        .expect("order B");

    let listed = system.service.list_orders().await.into_body().expect("list");
    let ids: Vec<_> = listed.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![a.id, b.id]);

    let missing = system
        .service
        .get_order("8c3f8e2e-1c4b-4d8e-9a55-3d7b0c6a1f00")
        .await;
    assert_eq!(missing.status_code(), 404);
    let malformed = system.service.get_order("not-an-id").await;
    assert_eq!(malformed.status_code(), 404);

    let health = system.service.health().await.into_body().expect("health");
    assert_eq!(health.orders, 2);
    assert_eq!(health.in_flight, 0);

    let route_spans: Vec<_> = exporter
        .roots()
        .into_iter()
        .map(|s| s.name.to_string())
        .filter(|name| name != CREATE_ORDER_SPAN)
        .collect();
    assert_eq!(
        route_spans,
        vec![LIST_ORDERS_SPAN, GET_ORDER_SPAN, GET_ORDER_SPAN, HEALTH_SPAN]
    );

    system.shutdown().await.expect("shutdown");
}

/// An invalid amount is rejected inside the pipeline, so the request is still counted
/// as an error, timed once, and traced with an ERROR root span.
#[tokio::test]
async fn test_invalid_amount_is_instrumented_like_any_request() {
    let faults = ScriptedFaults::new();
    let (system, exporter) = system_with(&faults);

    let reply = system
        .service
        .create_order(OrderRequest::with_amount(-4.0))
        .await;
    assert_eq!(reply.status_code(), 400);
    assert_eq!(reply.error().map(|e| e.code), Some("INVALID_AMOUNT"));

    // No downstream call is simulated for a rejected amount.
    faults.verify();
    assert_eq!(processed(&system, "error"), 1);
    assert_eq!(processed(&system, "success"), 0);
    let snapshot = system.telemetry().metrics().snapshot();
    assert_eq!(
        snapshot
            .histogram(PROCESSING_TIME_HISTOGRAM)
            .map(|h| h.count),
        Some(1)
    );
    assert_eq!(snapshot.up_down_counter(IN_FLIGHT_GAUGE).map(|g| g.value), Some(0));

    let roots = exporter.roots();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].name, CREATE_ORDER_SPAN);
    assert!(roots[0].status.is_error());

    system.shutdown().await.expect("shutdown");
}

/// The in-flight gauge nets to zero and the histogram gets one non-negative
/// observation per request, on success and failure alike.
#[tokio::test(start_paused = true)]
async fn test_cleanup_runs_on_every_exit_path() {
    let faults = ScriptedFaults::new();
    faults
        .otherwise(order_telemetry::fault::Draw::succeed(Duration::from_millis(15)));
    let (system, _exporter) = system_with(&faults);

    for round in 0..6 {
        if round % 2 == 1 {
            faults.expect("check_inventory").succeed();
            faults.expect("insert_order").succeed();
            faults
                .expect("process_payment")
                .fail_after(Duration::from_millis(120));
        }
        system.service.create_order(OrderRequest::default()).await;
    }

    let snapshot = system.telemetry().metrics().snapshot();
    assert_eq!(snapshot.up_down_counter(IN_FLIGHT_GAUGE).map(|g| g.value), Some(0));
    let histogram = snapshot
        .histogram(PROCESSING_TIME_HISTOGRAM)
        .expect("processing time");
    assert_eq!(histogram.count, 6);
    assert!(histogram.min.unwrap_or(-1.0) >= 0.0);
    assert_eq!(processed(&system, "success"), 3);
    assert_eq!(processed(&system, "error"), 3);

    system.shutdown().await.expect("shutdown");
}
