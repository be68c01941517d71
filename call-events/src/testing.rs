//! In-crate test doubles.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mi_client::{MiClient, MiEndpoint, MiError, Notification};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::datagram::DatagramEvents;
use crate::subscription::{EventCallback, Subscription};

/// MI client that records calls and answers locally.
pub(crate) struct FakeMi {
    endpoint: MiEndpoint,
    calls: Mutex<Vec<(String, Value)>>,
    fail_subscribe: AtomicBool,
    fail_unsubscribe: AtomicBool,
}

impl FakeMi {
    pub(crate) fn shared() -> Arc<Self> {
        let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();
        Self::with_endpoint(MiEndpoint::Udp(addr))
    }

    pub(crate) fn with_endpoint(endpoint: MiEndpoint) -> Arc<Self> {
        Arc::new(Self {
            endpoint,
            calls: Mutex::new(Vec::new()),
            fail_subscribe: AtomicBool::new(false),
            fail_unsubscribe: AtomicBool::new(false),
        })
    }

    pub(crate) fn fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_unsubscribe(&self, fail: bool) {
        self.fail_unsubscribe.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl MiClient for FakeMi {
    async fn call(&self, method: &str, params: Value) -> mi_client::Result<Value> {
        let unsubscribing = params["expire"] == 0;
        self.calls.lock().push((method.to_string(), params));

        let fail = if unsubscribing {
            self.fail_unsubscribe.load(Ordering::SeqCst)
        } else {
            self.fail_subscribe.load(Ordering::SeqCst)
        };

        if fail {
            Err(MiError::Rpc {
                code: 500,
                message: "Internal error".to_string(),
            })
        } else {
            Ok(json!("OK"))
        }
    }

    fn endpoint(&self) -> MiEndpoint {
        self.endpoint.clone()
    }
}

pub(crate) fn noop_callback() -> EventCallback {
    Arc::new(|_: Arc<dyn Subscription>, _: Notification| {})
}

/// Wait until every connection of `hub` has shut down and left it.
pub(crate) async fn wait_for_no_connections(hub: &DatagramEvents) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while hub.connection_count().await > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connection was not removed from the hub");
}
