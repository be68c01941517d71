//! Property-based tests for connection placement.
//!
//! Whatever order events are subscribed in, the hub must keep event names
//! unique per connection and open no more connections than the most repeated
//! event needs.


use std::collections::{HashMap, HashSet};

use call_events::{DatagramEvents, EventsConfig, Subscription};
use proptest::prelude::*;
use test_helpers::{noop_callback, LocalMi};

/// Short sequences over a small alphabet so events repeat often
fn event_sequence() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop::sample::select(vec!["dialog", "presence", "register", "E_CALL"]),
        1..10,
    )
    .prop_map(|events| events.into_iter().map(str::to_string).collect())
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_placement_is_minimal_and_distinct(events in event_sequence()) {
        let (connections, identities, subscribed) = runtime().block_on(async {
            let hub = DatagramEvents::new(LocalMi::shared(), EventsConfig::default()).unwrap();

            let mut subscriptions = Vec::new();
            for event in &events {
                subscriptions.push(hub.subscribe_event(event, noop_callback()).await.unwrap());
            }

            let connections: Vec<Vec<String>> = hub
                .connections()
                .await
                .iter()
                .map(|c| c.events())
                .collect();
            let identities: Vec<String> = subscriptions
                .iter()
                .map(|s| s.identity().to_string())
                .collect();
            let subscribed = subscriptions.iter().all(|s| s.is_subscribed());

            for sub in &subscriptions {
                sub.unsubscribe().await;
            }

            (connections, identities, subscribed)
        });

        let mut multiplicity: HashMap<&str, usize> = HashMap::new();
        for event in &events {
            *multiplicity.entry(event.as_str()).or_default() += 1;
        }
        let max = multiplicity.values().copied().max().unwrap_or(0);

        prop_assert!(subscribed);
        prop_assert_eq!(connections.len(), max);

        for events_on_connection in &connections {
            let unique: HashSet<&String> = events_on_connection.iter().collect();
            prop_assert_eq!(unique.len(), events_on_connection.len());
        }

        let total: usize = connections.iter().map(Vec::len).sum();
        prop_assert_eq!(total, events.len());

        // Every opened connection carries at least one subscription
        let distinct_identities: HashSet<&String> = identities.iter().collect();
        prop_assert_eq!(distinct_identities.len(), max);
    }

    #[test]
    fn prop_subscriptions_of_one_event_never_share_a_socket(count in 1usize..6) {
        let identities = runtime().block_on(async {
            let hub = DatagramEvents::new(LocalMi::shared(), EventsConfig::default()).unwrap();

            let mut subscriptions = Vec::new();
            for _ in 0..count {
                subscriptions.push(hub.subscribe_event("dialog", noop_callback()).await.unwrap());
            }
            let identities: HashSet<String> = subscriptions
                .iter()
                .map(|s| s.identity().to_string())
                .collect();

            for sub in &subscriptions {
                sub.unsubscribe().await;
            }
            identities
        });

        prop_assert_eq!(identities.len(), count);
    }
}
