//! External collaborator interfaces.
//!
//! This engine owns the wire codec, version negotiation, and the
//! error-action/retry logic; it does not own broker connections, the
//! metadata cache, or consumer-group coordinator bookkeeping. Those live
//! in collaborating components this crate only talks to through the
//! traits below. Because the suspension points this engine actually needs
//! ("send these bytes", "look up a coordinator") are simple round trips
//! rather than a long-lived reactor loop, the traits are synchronous —
//! there is no executor or future type threaded through this crate.

use std::time::Duration;

use bytes::Bytes;

use driver::{GroupRefresh, MetadataRefresh};
use errors::Result;

/// Sends an already-encoded request to a specific broker and returns its
/// raw reply bytes (header included). Implemented by the connection layer
/// this engine is embedded in.
pub trait BrokerSink {
    fn send(&self, broker_id: i32, request: &[u8], deadline: Duration) -> Result<Bytes>;
}

/// Hooks into the metadata cache beyond plain invalidation — used by
/// handlers that need to resolve a topic to its current leader before
/// building the next request.
pub trait MetadataHooks: MetadataRefresh {
    fn leader_for(&self, topic: &str, partition: i32) -> Option<i32>;
}

/// Hooks into consumer-group coordinator bookkeeping beyond plain
/// invalidation — used by the group-membership handlers.
pub trait GroupHooks: GroupRefresh {
    fn coordinator_for(&self, group_id: &str) -> Option<i32>;
}

/// Receives throttle-time observations reported by brokers on `v >= 1`
/// Produce/Fetch/ListOffsets replies, so a caller can back off cluster-wide
/// quota pressure instead of hammering a throttled broker.
pub trait ThrottleObserver {
    fn observe(&self, broker_id: i32, throttle_time_ms: i32);
}

/// Supplies wall-clock-independent time so envelope deadlines and handshake
/// timeouts are testable without sleeping. Production code uses
/// `std::time::Instant`/`Duration` directly; this exists only for tests
/// that need to simulate the passage of time deterministically.
pub trait Clock {
    fn now(&self) -> ::std::time::Instant;
}

#[cfg(test)]
pub mod fake {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    pub struct FakeCollaborators {
        pub invalidated_topics: RefCell<Vec<String>>,
        pub invalidated_coordinators: RefCell<Vec<String>>,
        pub coord_queries: RefCell<Vec<String>>,
        pub leaders: RefCell<HashMap<(String, i32), i32>>,
        pub coordinators: RefCell<HashMap<String, i32>>,
        pub throttles: RefCell<Vec<(i32, i32)>>,
    }

    impl MetadataRefresh for FakeCollaborators {
        fn invalidate_topic(&self, topic: &str) {
            self.invalidated_topics.borrow_mut().push(topic.to_owned());
        }
    }

    impl MetadataHooks for FakeCollaborators {
        fn leader_for(&self, topic: &str, partition: i32) -> Option<i32> {
            self.leaders.borrow().get(&(topic.to_owned(), partition)).cloned()
        }
    }

    impl GroupRefresh for FakeCollaborators {
        fn invalidate_coordinator(&self, group_id: &str) {
            self.invalidated_coordinators.borrow_mut().push(group_id.to_owned());
        }

        fn coord_query(&self, group_id: &str) {
            self.coord_queries.borrow_mut().push(group_id.to_owned());
        }
    }

    impl GroupHooks for FakeCollaborators {
        fn coordinator_for(&self, group_id: &str) -> Option<i32> {
            self.coordinators.borrow().get(group_id).cloned()
        }
    }

    impl ThrottleObserver for FakeCollaborators {
        fn observe(&self, broker_id: i32, throttle_time_ms: i32) {
            self.throttles.borrow_mut().push((broker_id, throttle_time_ms));
        }
    }

    #[test]
    fn invalidating_a_topic_is_observable() {
        let fake = FakeCollaborators::default();
        fake.invalidate_topic("orders");
        assert_eq!(&*fake.invalidated_topics.borrow(), &["orders".to_owned()]);
    }

    #[test]
    fn leader_lookup_reflects_seeded_state() {
        let fake = FakeCollaborators::default();
        fake.leaders.borrow_mut().insert(("orders".to_owned(), 0), 3);
        assert_eq!(fake.leader_for("orders", 0), Some(3));
        assert_eq!(fake.leader_for("orders", 1), None);
    }
}
