//! C4 — the request envelope: the unit of in-flight work the driver and
//! suppressor reason about, independent of which API it wraps.
//!
//! `RequestBody` and `KafkaEvent` are tagged variants rather than a
//! generic `Envelope<Req, Resp>` plus a boxed handler: the set of APIs
//! this engine speaks is fixed and small, so the dispatch the driver needs
//! ("given a reply's correlation id, decode it as whatever its envelope
//! says it should be, and hand back a typed event") collapses to a single
//! match over the variant rather than runtime function-pointer calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;

use errors::KafkaCode;
use protocol::{DescribeGroupsResponse, GroupCoordinatorResponse, HeartbeatResponse,
               JoinGroupRequest, JoinGroupResponse, LeaveGroupResponse, ListGroupsResponse,
               MetadataRequest, MetadataResponse, OffsetCommitRequest, OffsetCommitResponse,
               OffsetFetchRequest, OffsetFetchResponse, OffsetRequest, OffsetResponse,
               ProduceResponse, SupportedApiVersion, SyncGroupResponse};
use protocol::group::{HeartbeatRequest, SyncGroupRequest};
use protocol::produce::ProduceRequest;

/// A request never retries: used for ApiVersion and SaslHandshake, which
/// run once ahead of version negotiation and have no meaningful retry
/// target.
pub const NO_RETRIES: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Normal,
    /// `Flash` — jumps ahead of queued `Normal` work on the same
    /// connection. Reserved for the control-plane APIs that the rest of
    /// the client is blocked on: Metadata, ApiVersions, SaslHandshake.
    /// Flash requests may overtake non-flash traffic but do not reorder
    /// amongst themselves. See `requests::build_metadata`,
    /// `requests::build_api_versions`, `requests::build_sasl_handshake`.
    Expedited,
}

/// Where an envelope sits in its own lifecycle. Distinct from `Action`
/// (C7's verdict on an error) — this is the envelope's own state machine,
/// independent of whether anything has failed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    /// Built, not yet handed to a broker connection.
    Pending,
    /// Sent; waiting for an ordinary reply.
    WaitReply,
    /// Sent as the group leader's SyncGroup; waiting specifically for the
    /// assignment broadcast. See `protocol::group::accept_sync_group_reply`.
    WaitSync,
    /// A reply arrived and was delivered to the caller.
    Done,
    /// The caller canceled the request before a reply arrived.
    Canceled,
}

/// Tags every in-flight reply route with a monotonic epoch. Canceling a
/// route bumps the epoch; a reply that names an older epoch than the one
/// current when it arrives is stale — the caller has already moved on
/// (resent, given up, or rebalanced) — and must be dropped rather than
/// delivered.
#[derive(Debug, Clone)]
pub struct ReplyEpoch(Arc<AtomicUsize>);

impl ReplyEpoch {
    pub fn new() -> ReplyEpoch {
        ReplyEpoch(Arc::new(AtomicUsize::new(0)))
    }

    /// Captures the epoch at the moment a route is armed; pass the result
    /// back to `is_current` when a reply for that route arrives.
    pub fn stamp(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// Invalidates every outstanding stamp taken before this call.
    pub fn cancel(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_current(&self, stamp: usize) -> bool {
        self.0.load(Ordering::SeqCst) == stamp
    }
}

/// Generates correlation ids for outbound requests. Wraps on overflow —
/// Kafka correlation ids are just opaque echo values, not a total order.
pub struct CorrelationIdGen(AtomicUsize);

impl CorrelationIdGen {
    pub fn new() -> CorrelationIdGen {
        CorrelationIdGen(AtomicUsize::new(0))
    }

    pub fn next(&self) -> i32 {
        self.0.fetch_add(1, Ordering::Relaxed) as i32
    }
}

/// One request body per API this engine speaks. The variant itself is the
/// dispatch tag: a handler lookup is a single match, not a registered
/// callback.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Metadata(MetadataRequest),
    Offset(OffsetRequest),
    OffsetFetch(OffsetFetchRequest),
    OffsetCommit(OffsetCommitRequest),
    Produce(ProduceRequest),
    GroupCoordinator(String),
    JoinGroup(JoinGroupRequest),
    SyncGroup(SyncGroupRequest),
    Heartbeat(HeartbeatRequest),
    LeaveGroup { group_id: String, member_id: String },
    ListGroups,
    DescribeGroups(Vec<String>),
    ApiVersions,
    SaslHandshake(String),
    /// CreateTopics/DeleteTopics/CreatePartitions/AlterConfigs/DescribeConfigs:
    /// the admin family returns its reply as an undecoded buffer (see
    /// `protocol::admin`), so the request side only needs to carry the
    /// already-encoded body through to the wire.
    Admin(Bytes),
}

impl RequestBody {
    pub fn api_key(&self) -> &'static str {
        match *self {
            RequestBody::Metadata(_) => "Metadata",
            RequestBody::Offset(_) => "Offset",
            RequestBody::OffsetFetch(_) => "OffsetFetch",
            RequestBody::OffsetCommit(_) => "OffsetCommit",
            RequestBody::Produce(_) => "Produce",
            RequestBody::GroupCoordinator(_) => "GroupCoordinator",
            RequestBody::JoinGroup(_) => "JoinGroup",
            RequestBody::SyncGroup(_) => "SyncGroup",
            RequestBody::Heartbeat(_) => "Heartbeat",
            RequestBody::LeaveGroup { .. } => "LeaveGroup",
            RequestBody::ListGroups => "ListGroups",
            RequestBody::DescribeGroups(_) => "DescribeGroups",
            RequestBody::ApiVersions => "ApiVersions",
            RequestBody::SaslHandshake(_) => "SaslHandshake",
            RequestBody::Admin(_) => "Admin",
        }
    }
}

/// One outcome variant per API, the concrete payload type a `ReplyRoute`
/// delivers to its caller. `Failed` covers both broker-reported errors and
/// client-local failures (timeout, transport loss, cancellation) that
/// never made it to a typed reply.
#[derive(Debug, Clone, PartialEq)]
pub enum KafkaEvent {
    Metadata(MetadataResponse),
    Offset(OffsetResponse),
    OffsetFetch(OffsetFetchResponse),
    OffsetCommit(OffsetCommitResponse),
    Produce(ProduceResponse),
    GroupCoordinator(GroupCoordinatorResponse),
    JoinGroup(JoinGroupResponse),
    SyncGroup(SyncGroupResponse),
    Heartbeat(HeartbeatResponse),
    LeaveGroup(LeaveGroupResponse),
    ListGroups(ListGroupsResponse),
    DescribeGroups(DescribeGroupsResponse),
    ApiVersions(Vec<SupportedApiVersion>),
    SaslHandshake,
    Admin(Bytes),
    Failed(KafkaCode),
}

/// The unit of in-flight work: a request body, its deadline, its retry
/// budget, and the reply route it will eventually be delivered through.
pub struct RequestEnvelope {
    pub correlation_id: i32,
    pub body: RequestBody,
    pub priority: Priority,
    pub state: EnvelopeState,
    pub deadline: Instant,
    pub retries_remaining: i32,
    pub reply_epoch: ReplyEpoch,
    reply_stamp: usize,
}

impl RequestEnvelope {
    pub fn new(correlation_id: i32, body: RequestBody, priority: Priority, timeout: Duration, retries: i32) -> RequestEnvelope {
        let reply_epoch = ReplyEpoch::new();
        let reply_stamp = reply_epoch.stamp();
        RequestEnvelope {
            correlation_id: correlation_id,
            body: body,
            priority: priority,
            state: EnvelopeState::Pending,
            deadline: Instant::now() + timeout,
            retries_remaining: retries,
            reply_epoch: reply_epoch,
            reply_stamp: reply_stamp,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    pub fn has_retries(&self) -> bool {
        self.retries_remaining > 0
    }

    /// Cancels this envelope's reply route: any reply already in flight for
    /// it will be recognized as stale and dropped instead of delivered.
    pub fn cancel(&mut self) {
        self.reply_epoch.cancel();
        self.state = EnvelopeState::Canceled;
    }

    /// Whether a reply arriving right now is still the one this envelope is
    /// waiting for.
    pub fn reply_is_current(&self) -> bool {
        self.reply_epoch.is_current(self.reply_stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canceling_an_envelope_makes_its_stamped_reply_stale() {
        let mut env = RequestEnvelope::new(1, RequestBody::ListGroups, Priority::Normal, Duration::from_secs(1), 0);
        assert!(env.reply_is_current());
        env.cancel();
        assert!(!env.reply_is_current());
    }

    #[test]
    fn no_retries_means_retries_remaining_is_the_no_retries_constant() {
        let env = RequestEnvelope::new(1, RequestBody::ApiVersions, Priority::Normal, Duration::from_secs(1), NO_RETRIES);
        assert!(!env.has_retries());
    }

    #[test]
    fn expiry_compares_against_the_stored_deadline() {
        let env = RequestEnvelope::new(1, RequestBody::ListGroups, Priority::Normal, Duration::from_millis(0), 0);
        assert!(env.is_expired(Instant::now() + Duration::from_millis(1)));
    }
}
