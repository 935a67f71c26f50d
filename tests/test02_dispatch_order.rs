mod common;

use std::time::Duration;

use common::{fast_settings, record_events, scripted_engine, unused_target, wait_for, Delivered, Step};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn serialized_queries_deliver_in_submission_order() {
    let (engine, bootstrap) = scripted_engine(fast_settings(3));
    let events = record_events(&engine);

    // stagger latencies so out-of-order completion would show up if the
    // gate ever let two serialized queries overlap
    for i in 0..8 {
        bootstrap.script(
            &format!("select {i}"),
            vec![Step::OkAfter(Duration::from_millis(5 * (8 - i)))],
        );
    }

    engine.connect(unused_target()).await.unwrap();
    let ids: Vec<_> = (0..8)
        .map(|i| engine.query(format!("select {i}"), vec![]))
        .collect();

    assert!(wait_for(|| events.lock().unwrap().len() == ids.len(), Duration::from_secs(5)).await);
    let expected: Vec<_> = ids.iter().map(|id| Delivered::Data(*id)).collect();
    assert_eq!(*events.lock().unwrap(), expected);

    engine.disconnect().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_queries_bypass_the_gate() {
    let (engine, bootstrap) = scripted_engine(fast_settings(2));
    let events = record_events(&engine);

    bootstrap.script("slow", vec![Step::OkAfter(Duration::from_millis(300))]);
    bootstrap.script("fast", vec![Step::OkAfter(Duration::from_millis(10))]);

    engine.connect(unused_target()).await.unwrap();
    let slow = engine.parallel_query("slow", vec![]);
    let fast = engine.parallel_query("fast", vec![]);

    assert!(wait_for(|| events.lock().unwrap().len() == 2, Duration::from_secs(5)).await);
    // the fast one did not wait behind the slow one's I/O
    assert_eq!(
        *events.lock().unwrap(),
        vec![Delivered::Data(fast), Delivered::Data(slow)]
    );

    engine.disconnect().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn disconnect_discards_backlog_and_silences_events() {
    let (engine, _bootstrap) = scripted_engine(fast_settings(1));
    let events = record_events(&engine);

    engine.connect(unused_target()).await.unwrap();
    engine.disconnect().await;

    // submissions while disconnected queue up but never dispatch
    let pending = engine.query("select 1", vec![]);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(events.lock().unwrap().is_empty());
    assert_eq!(engine.backlog_len(), 1);
    assert!(!engine.is_busy());

    // a fresh connect drains what queued up in the meantime
    engine.connect(unused_target()).await.unwrap();
    assert!(wait_for(|| events.lock().unwrap().len() == 1, Duration::from_secs(5)).await);
    assert_eq!(*events.lock().unwrap(), vec![Delivered::Data(pending)]);

    engine.disconnect().await;
    assert!(engine.pool_status().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn query_error_never_retries() {
    let (engine, bootstrap) = scripted_engine(fast_settings(2));
    let events = record_events(&engine);

    bootstrap.script("broken", vec![Step::Fail, Step::Ok]);

    engine.connect(unused_target()).await.unwrap();
    let broken = engine.query("broken", vec![]);
    let fine = engine.query("fine", vec![]);

    assert!(wait_for(|| events.lock().unwrap().len() == 2, Duration::from_secs(5)).await);
    assert_eq!(
        *events.lock().unwrap(),
        vec![Delivered::Error(broken), Delivered::Data(fine)]
    );
    // one connection per pool slot, no reconnects for a query-level error
    assert_eq!(bootstrap.connect_count(), 2);

    engine.disconnect().await;
}
