//! Graceful shutdown of listener groups.

use std::time::{Duration, Instant};

use listener_group::lifecycle::startup::run_listeners;
use listener_group::lifecycle::{ShutdownCoordinator, ShutdownSignal, SignalWatcher, TaskGroup};
use listener_group::net::{Listener, ListenerState};
use listener_group::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

mod common;

const GRACE: Duration = Duration::from_secs(2);

#[tokio::test]
async fn terminate_stops_every_listener() {
    let listeners: Vec<_> = (0..3)
        .map(|i| common::slow_listener(&format!("svc{i}"), Duration::from_millis(50)))
        .collect();
    let (watcher, trigger) = SignalWatcher::manual();

    let run = tokio::spawn({
        let listeners = listeners.clone();
        async move { run_listeners(TaskGroup::new(), &listeners, GRACE, watcher).await }
    });

    let addrs = common::wait_all_bound(&listeners).await;
    let client = common::client();
    for addr in &addrs {
        let body = client
            .get(format!("http://{addr}/"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "Hello world\n");
    }

    let start = Instant::now();
    assert!(trigger.send(ShutdownSignal::Terminate));
    let result = tokio::time::timeout(GRACE + Duration::from_secs(1), run)
        .await
        .expect("group did not stop within the grace period")
        .unwrap();

    assert!(matches!(
        result,
        Err(Error::SignalReceived(ShutdownSignal::Terminate))
    ));
    assert!(start.elapsed() < GRACE);
    for listener in &listeners {
        assert_eq!(listener.state(), ListenerState::Stopped);
    }
}

#[tokio::test]
async fn external_cancellation_reports_success() {
    let listeners = vec![
        common::slow_listener("a", Duration::from_millis(10)),
        common::slow_listener("b", Duration::from_millis(10)),
    ];
    let (watcher, _trigger) = SignalWatcher::manual();
    let parent = CancellationToken::new();

    let run = tokio::spawn({
        let listeners = listeners.clone();
        let group = TaskGroup::with_parent(&parent);
        async move { run_listeners(group, &listeners, GRACE, watcher).await }
    });

    common::wait_all_bound(&listeners).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    parent.cancel();

    let result = tokio::time::timeout(GRACE, run)
        .await
        .expect("group did not stop")
        .unwrap();
    assert!(result.is_ok(), "unexpected error: {result:?}");
    for listener in &listeners {
        assert_eq!(listener.state(), ListenerState::Stopped);
    }
}

#[tokio::test]
async fn in_flight_request_finishes_before_exit() {
    let delay = Duration::from_secs(1);
    let listener = common::slow_listener("slow", delay);
    let (watcher, trigger) = SignalWatcher::manual();

    let run = tokio::spawn({
        let listeners = vec![listener.clone()];
        async move { run_listeners(TaskGroup::new(), &listeners, GRACE, watcher).await }
    });
    let addr = common::wait_all_bound(std::slice::from_ref(&listener)).await[0];

    let started = Instant::now();
    let request = tokio::spawn(async move {
        common::client()
            .get(format!("http://{addr}/work"))
            .send()
            .await?
            .text()
            .await
    });
    common::wait_for_in_flight(&listener, 1).await;

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(trigger.send(ShutdownSignal::Interrupt));

    // New connections are refused while the old one drains.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    assert_eq!(listener.in_flight().active_count(), 1);

    let body = request.await.unwrap().expect("in-flight request should complete");
    assert_eq!(body, "Hello world\n");

    let result = tokio::time::timeout(GRACE, run).await.unwrap().unwrap();
    assert!(matches!(
        result,
        Err(Error::SignalReceived(ShutdownSignal::Interrupt))
    ));
    assert!(started.elapsed() >= delay);
    assert_eq!(listener.state(), ListenerState::Stopped);
}

#[tokio::test]
async fn request_outliving_grace_period_times_out() {
    let listener = common::slow_listener("stuck", Duration::from_millis(1500));
    let grace = Duration::from_millis(200);

    let server = tokio::spawn({
        let listener = listener.clone();
        async move { listener.serve().await }
    });
    let addr = common::wait_all_bound(std::slice::from_ref(&listener)).await[0];

    let request = tokio::spawn(async move {
        common::client().get(format!("http://{addr}/")).send().await
    });
    common::wait_for_in_flight(&listener, 1).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = ShutdownCoordinator::new(listener.clone(), grace)
        .run(cancel)
        .await;

    match result {
        Err(Error::ShutdownTimeout { grace_period, .. }) => assert_eq!(grace_period, grace),
        other => panic!("expected timeout, got {other:?}"),
    }

    // The request is abandoned, so serve returns without waiting for it.
    tokio::time::timeout(Duration::from_millis(500), server)
        .await
        .expect("serve should return once the deadline passes")
        .unwrap()
        .unwrap();
    assert_eq!(listener.state(), ListenerState::Stopped);
    drop(request);
}

/// Open a connection that sends an unterminated request head.
async fn half_open_request(addr: std::net::SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: x\r\n")
        .await
        .unwrap();
    // Give the server time to accept it.
    tokio::time::sleep(Duration::from_millis(100)).await;
    stream
}

#[tokio::test]
async fn half_open_connection_cannot_outlast_grace_period() {
    let listener = common::slow_listener("half-open", Duration::from_millis(10));
    let (watcher, trigger) = SignalWatcher::manual();

    let run = tokio::spawn({
        let listeners = vec![listener.clone()];
        async move { run_listeners(TaskGroup::new(), &listeners, GRACE, watcher).await }
    });
    let addr = common::wait_all_bound(std::slice::from_ref(&listener)).await[0];
    let stream = half_open_request(addr).await;

    let start = Instant::now();
    assert!(trigger.send(ShutdownSignal::Terminate));
    let result = tokio::time::timeout(GRACE + Duration::from_secs(1), run)
        .await
        .expect("half-open connection kept the group alive")
        .unwrap();

    assert!(matches!(
        result,
        Err(Error::SignalReceived(ShutdownSignal::Terminate))
    ));
    assert!(start.elapsed() < GRACE + Duration::from_secs(1));
    assert_eq!(listener.state(), ListenerState::Stopped);
    drop(stream);
}

#[tokio::test]
async fn second_signal_forces_shutdown() {
    let grace = Duration::from_secs(30);
    let listener = common::slow_listener("stuck", Duration::from_secs(30));
    let (watcher, trigger) = SignalWatcher::manual();

    let run = tokio::spawn({
        let listeners = vec![listener.clone()];
        async move { run_listeners(TaskGroup::new(), &listeners, grace, watcher).await }
    });
    let addr = common::wait_all_bound(std::slice::from_ref(&listener)).await[0];

    let request = tokio::spawn(async move {
        common::client().get(format!("http://{addr}/")).send().await
    });
    common::wait_for_in_flight(&listener, 1).await;
    let stream = half_open_request(addr).await;

    assert!(trigger.send(ShutdownSignal::Terminate));
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!run.is_finished());
    assert_eq!(listener.state(), ListenerState::Draining);

    let start = Instant::now();
    assert!(trigger.send(ShutdownSignal::Interrupt));
    let result = tokio::time::timeout(Duration::from_secs(2), run)
        .await
        .expect("second signal did not force shutdown")
        .unwrap();

    // The first signal stays the reported cause.
    assert!(matches!(
        result,
        Err(Error::SignalReceived(ShutdownSignal::Terminate))
    ));
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(listener.state(), ListenerState::Stopped);
    drop(stream);
    request.abort();
}
