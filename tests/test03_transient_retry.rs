mod common;

use std::time::Duration;

use common::{fast_settings, record_events, scripted_engine, unused_target, wait_for, Delivered, Step};

/// Pool of 2; Q1, Q2, Q3 submitted sequentially (non-parallel); Q2's first
/// attempt fails transiently. Expected: onData(Q1), onData(Q2) after one
/// retry, onData(Q3), each exactly once, in that order.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn transient_failure_retries_exactly_once_in_order() {
    let (engine, bootstrap) = scripted_engine(fast_settings(2));
    let events = record_events(&engine);

    bootstrap.script("q2", vec![Step::Transient, Step::Ok]);

    engine.connect(unused_target()).await.unwrap();
    assert_eq!(bootstrap.connect_count(), 2);

    let q1 = engine.query("q1", vec![]);
    let q2 = engine.query("q2", vec![]);
    let q3 = engine.query("q3", vec![]);

    assert!(
        wait_for(|| events.lock().unwrap().len() == 3, Duration::from_secs(5)).await,
        "expected three deliveries, got {:?}",
        events.lock().unwrap()
    );
    assert_eq!(
        *events.lock().unwrap(),
        vec![
            Delivered::Data(q1),
            Delivered::Data(q2),
            Delivered::Data(q3),
        ]
    );

    // the broken connection was replaced by exactly one reconnect
    assert!(
        wait_for(|| bootstrap.connect_count() == 3, Duration::from_secs(5)).await,
        "reconnect never completed"
    );

    // pool back at full strength once the replacement is adopted
    assert!(
        wait_for(
            || {
                let status = engine.pool_status().unwrap();
                status.free == status.capacity && status.in_use == 0
            },
            Duration::from_secs(5)
        )
        .await
    );
    assert!(!engine.is_busy());

    engine.disconnect().await;
}

/// The `free + in_use == capacity` accounting holds at every observation
/// point while submissions and an injected transient failure are in flight,
/// allowing the one-connection dip during its reconnect transition.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pool_invariant_holds_under_transient_churn() {
    let (engine, bootstrap) = scripted_engine(fast_settings(3));
    let events = record_events(&engine);

    bootstrap.script("flaky", vec![Step::Transient, Step::Ok]);

    engine.connect(unused_target()).await.unwrap();
    let mut ids = vec![engine.query("flaky", vec![])];
    for i in 0..12 {
        ids.push(engine.parallel_query(format!("p{i}"), vec![]));
    }

    let mut observations = 0usize;
    while events.lock().unwrap().len() < ids.len() && observations < 500 {
        let status = engine.pool_status().unwrap();
        let accounted = status.free + status.in_use;
        assert!(
            accounted == status.capacity || accounted + 1 == status.capacity,
            "pool accounting broken: {status:?}"
        );
        observations += 1;
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    assert!(wait_for(|| events.lock().unwrap().len() == ids.len(), Duration::from_secs(5)).await);
    // every query delivered exactly once, transient retry included
    let delivered = events.lock().unwrap();
    assert_eq!(delivered.len(), ids.len());
    for id in &ids {
        assert_eq!(
            delivered.iter().filter(|e| **e == Delivered::Data(*id)).count(),
            1,
            "duplicate or missing delivery for {id}"
        );
    }
    drop(delivered);

    assert!(
        wait_for(
            || {
                let status = engine.pool_status().unwrap();
                status.free == status.capacity
            },
            Duration::from_secs(5)
        )
        .await
    );

    engine.disconnect().await;
}
