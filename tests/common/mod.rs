//! Shared utilities for lifecycle integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use listener_group::http::SlowHandler;
use listener_group::net::{HttpListener, ListenerSpec};

/// A listener on an ephemeral port whose handler takes `delay`.
pub fn slow_listener(name: &str, delay: Duration) -> Arc<HttpListener> {
    listener_at(name, "127.0.0.1:0", delay)
}

pub fn listener_at(name: &str, address: &str, delay: Duration) -> Arc<HttpListener> {
    let handler = SlowHandler::new(delay, "Hello world\n").into_router();
    Arc::new(HttpListener::new(ListenerSpec::new(name, address, handler)))
}

/// Wait until every listener has bound and return their addresses.
pub async fn wait_all_bound(listeners: &[Arc<HttpListener>]) -> Vec<SocketAddr> {
    let mut addrs = Vec::with_capacity(listeners.len());
    for listener in listeners {
        let addr = tokio::time::timeout(Duration::from_secs(5), listener.wait_bound())
            .await
            .expect("listener did not bind in time")
            .expect("listener failed to bind");
        addrs.push(addr);
    }
    addrs
}

/// Wait until `listener` is serving `count` requests.
#[allow(dead_code)]
pub async fn wait_for_in_flight(listener: &HttpListener, count: u64) {
    tokio::time::timeout(
        Duration::from_secs(5),
        listener.in_flight().wait_for_active(count),
    )
    .await
    .expect("requests never reached the listener");
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
