//! C3 integration — one request-building call per API.
//!
//! Everything under `protocol` is pure: encode a request, decode a
//! response, nothing else. This module is the seam the rest of the engine
//! (C4 version negotiation, the full-request suppressor, the
//! skip-if-no-work filters, and the envelope itself) is actually wired
//! through. Each function here takes one API's caller-supplied arguments
//! and returns either a `Built` request — an envelope plus its
//! already-encoded wire bytes, ready to hand to a `BrokerSink` — or an
//! error classification (`UnsupportedFeature`, `InvalidArg`,
//! `PrevInProgress`). OffsetFetch and OffsetCommit return an `Outcome`
//! instead, since the skip-if-no-work filter means there may be nothing to
//! send at all.
//!
//! What happens to a `Built` request once it's handed back — enqueuing it
//! on a connection, calling `BrokerSink::send`, decoding the reply and
//! running it through `classify`/`driver` — is the caller's job. This
//! module only owns the part every API has in common: turning arguments
//! into a correctly negotiated, correctly suppressed, correctly filtered
//! wire request and envelope.

use std::time::Duration;

use bytes::{Bytes, BytesMut};

use envelope::{KafkaEvent, Priority, RequestBody, RequestEnvelope, NO_RETRIES};
use errors::Result;
use protocol::admin::{self, ConfigResource, DescribeConfigsResource, NewPartitions, NewTopic};
use protocol::api_versions;
use protocol::group::{self, HeartbeatRequest, JoinGroupRequest, SyncGroupRequest};
use protocol::metadata::{self, MetadataRequest};
use protocol::offset::{self, OffsetRequest};
use protocol::offset_commit::{self, OffsetCommitRequest, OffsetCommitResponse};
use protocol::offset_fetch::{self, OffsetFetchRequest, OffsetFetchResponse};
use protocol::produce::{self, ProduceRequest};
use protocol::sasl;
use protocol::{ApiKeys, RequestHeader};
use suppress::{FullRequestKind, FullRequestSuppressor, Permit};
use version::ApiVersionTable;

/// A request ready for a `BrokerSink`: the envelope the driver and reply
/// routing reason about, and its already-encoded wire bytes. Metadata's
/// full-cluster shapes also carry the suppressor permit, which must live
/// until the reply (or failure) is observed — dropping it as soon as
/// `Built` is returned would let a second full request through before this
/// one has actually completed.
pub struct Built<'a> {
    pub envelope: RequestEnvelope,
    pub wire: Bytes,
    pub permit: Option<Permit<'a>>,
}

/// OffsetFetch/OffsetCommit may have nothing left to ask the broker for
/// once their skip-if-no-work filter runs.
pub enum Outcome<'a> {
    Send(Built<'a>),
    /// The filtered request was empty; no round trip was made. Carries the
    /// synthetic success reply the caller's response callback should
    /// receive instead.
    Skipped(KafkaEvent),
}

fn build_wire<F>(api_key: ApiKeys, api_version: i16, correlation_id: i32, client_id: Option<&str>, encode: F) -> Result<Bytes>
    where F: FnOnce(&RequestHeader, &mut BytesMut) -> Result<()>
{
    let header = RequestHeader { api_key: api_key, api_version: api_version, correlation_id: correlation_id, client_id: client_id };
    let mut buf = BytesMut::with_capacity(128);
    encode(&header, &mut buf)?;
    Ok(buf.freeze())
}

/// Deadline shared by JoinGroup and SyncGroup: both are `Blocking`
/// requests whose caller is willing to wait roughly as long as the group's
/// own session timeout, plus a grace window for the coordinator's own
/// rebalance bookkeeping.
fn blocking_deadline(session_timeout_ms: i32) -> Duration {
    Duration::from_millis(session_timeout_ms.max(0) as u64) + Duration::from_millis(3000)
}

// --- Metadata ---

pub fn build_metadata<'a>(req: MetadataRequest, api_version: i16, correlation_id: i32, client_id: Option<&str>,
                          socket_timeout: Duration, retries: i32, force: bool,
                          suppressor: &'a FullRequestSuppressor) -> Result<Built<'a>> {
    let permit = if req.is_full_request() {
        let kind = match req.topics {
            None => FullRequestKind::Topics,
            Some(_) => FullRequestKind::Brokers,
        };
        Some(suppressor.begin(kind, force)?)
    } else {
        None
    };

    let wire = build_wire(ApiKeys::Metadata, api_version, correlation_id, client_id,
        |header, dst| metadata::encode_metadata(header, &req, api_version, dst))?;

    let envelope = RequestEnvelope::new(correlation_id, RequestBody::Metadata(req), Priority::Expedited, socket_timeout, retries);
    Ok(Built { envelope: envelope, wire: wire, permit: permit })
}

// --- ListOffsets ---

pub fn build_offset<'a>(req: OffsetRequest, api_version: i16, supports_offset_time: bool, correlation_id: i32,
                        client_id: Option<&str>, socket_timeout: Duration, retries: i32) -> Result<Built<'a>> {
    let wire = build_wire(ApiKeys::Offsets, api_version, correlation_id, client_id,
        |header, dst| offset::encode_offset(header, &req, api_version, supports_offset_time, dst))?;

    let envelope = RequestEnvelope::new(correlation_id, RequestBody::Offset(req), Priority::Normal, socket_timeout, retries);
    Ok(Built { envelope: envelope, wire: wire, permit: None })
}

// --- OffsetFetch ---

pub fn build_offset_fetch<'a>(req: OffsetFetchRequest, correlation_id: i32, client_id: Option<&str>,
                              socket_timeout: Duration, retries: i32) -> Result<Outcome<'a>> {
    if req.is_empty_after_filter() {
        return Ok(Outcome::Skipped(KafkaEvent::OffsetFetch(OffsetFetchResponse::empty(correlation_id))));
    }

    let wire = build_wire(ApiKeys::OffsetFetch, 1, correlation_id, client_id,
        |header, dst| offset_fetch::encode_offset_fetch(header, &req, dst))?;

    let envelope = RequestEnvelope::new(correlation_id, RequestBody::OffsetFetch(req), Priority::Normal, socket_timeout, retries);
    Ok(Outcome::Send(Built { envelope: envelope, wire: wire, permit: None }))
}

// --- OffsetCommit ---

pub fn build_offset_commit<'a>(req: OffsetCommitRequest, api_version: i16, correlation_id: i32, client_id: Option<&str>,
                               socket_timeout: Duration, retries: i32) -> Result<Outcome<'a>> {
    if req.is_empty_after_filter() {
        return Ok(Outcome::Skipped(KafkaEvent::OffsetCommit(OffsetCommitResponse::empty(correlation_id))));
    }

    let wire = build_wire(ApiKeys::OffsetCommit, api_version, correlation_id, client_id,
        |header, dst| offset_commit::encode_offset_commit(header, &req, api_version, dst))?;

    let envelope = RequestEnvelope::new(correlation_id, RequestBody::OffsetCommit(req), Priority::Normal, socket_timeout, retries);
    Ok(Outcome::Send(Built { envelope: envelope, wire: wire, permit: None }))
}

// --- Produce ---

pub fn build_produce<'a>(req: ProduceRequest, api_version: i16, correlation_id: i32, client_id: Option<&str>,
                         retries: i32) -> Result<Built<'a>> {
    produce::handle_produce(&req)?;
    let deadline = req.deadline();

    let wire = build_wire(ApiKeys::Produce, api_version, correlation_id, client_id,
        |header, dst| produce::encode_produce(header, &req, dst))?;

    let retries = if req.expects_response() { retries } else { NO_RETRIES };
    let envelope = RequestEnvelope::new(correlation_id, RequestBody::Produce(req), Priority::Normal, deadline, retries);
    Ok(Built { envelope: envelope, wire: wire, permit: None })
}

// --- GroupCoordinator ---

pub fn build_group_coordinator<'a>(group_id: String, correlation_id: i32, client_id: Option<&str>,
                                   socket_timeout: Duration, retries: i32) -> Result<Built<'a>> {
    let wire = build_wire(ApiKeys::GroupCoordinator, 0, correlation_id, client_id,
        |header, dst| group::encode_group_coordinator(header, &group_id, dst))?;

    let envelope = RequestEnvelope::new(correlation_id, RequestBody::GroupCoordinator(group_id), Priority::Normal, socket_timeout, retries);
    Ok(Built { envelope: envelope, wire: wire, permit: None })
}

// --- JoinGroup ---

pub fn build_join_group<'a>(req: JoinGroupRequest, api_version: i16, correlation_id: i32, client_id: Option<&str>,
                            retries: i32) -> Result<Built<'a>> {
    let deadline = blocking_deadline(req.session_timeout_ms);

    let wire = build_wire(ApiKeys::JoinGroup, api_version, correlation_id, client_id,
        |header, dst| group::encode_join_group(header, &req, api_version, dst))?;

    let envelope = RequestEnvelope::new(correlation_id, RequestBody::JoinGroup(req), Priority::Normal, deadline, retries);
    Ok(Built { envelope: envelope, wire: wire, permit: None })
}

// --- SyncGroup ---

pub fn build_sync_group<'a>(req: SyncGroupRequest, correlation_id: i32, client_id: Option<&str>,
                            session_timeout_ms: i32, retries: i32) -> Result<Built<'a>> {
    let deadline = blocking_deadline(session_timeout_ms);

    let wire = build_wire(ApiKeys::SyncGroup, 0, correlation_id, client_id,
        |header, dst| group::encode_sync_group(header, &req, dst))?;

    let envelope = RequestEnvelope::new(correlation_id, RequestBody::SyncGroup(req), Priority::Normal, deadline, retries);
    Ok(Built { envelope: envelope, wire: wire, permit: None })
}

// --- Heartbeat ---

pub fn build_heartbeat<'a>(req: HeartbeatRequest, correlation_id: i32, client_id: Option<&str>,
                           session_timeout_ms: i32) -> Result<Built<'a>> {
    let deadline = Duration::from_millis(session_timeout_ms.max(0) as u64);

    let wire = build_wire(ApiKeys::Heartbeat, 0, correlation_id, client_id,
        |header, dst| group::encode_heartbeat(header, &req, dst))?;

    let envelope = RequestEnvelope::new(correlation_id, RequestBody::Heartbeat(req), Priority::Normal, deadline, NO_RETRIES);
    Ok(Built { envelope: envelope, wire: wire, permit: None })
}

// --- LeaveGroup ---

pub fn build_leave_group<'a>(group_id: String, member_id: String, correlation_id: i32, client_id: Option<&str>,
                             socket_timeout: Duration) -> Result<Built<'a>> {
    let wire = build_wire(ApiKeys::LeaveGroup, 0, correlation_id, client_id,
        |header, dst| group::encode_leave_group(header, &group_id, &member_id, dst))?;

    let body = RequestBody::LeaveGroup { group_id: group_id, member_id: member_id };
    let envelope = RequestEnvelope::new(correlation_id, body, Priority::Normal, socket_timeout, NO_RETRIES);
    Ok(Built { envelope: envelope, wire: wire, permit: None })
}

// --- ListGroups ---

pub fn build_list_groups<'a>(correlation_id: i32, client_id: Option<&str>, socket_timeout: Duration,
                             retries: i32) -> Result<Built<'a>> {
    let wire = build_wire(ApiKeys::ListGroups, 0, correlation_id, client_id,
        |header, dst| group::encode_list_groups(header, dst))?;

    let envelope = RequestEnvelope::new(correlation_id, RequestBody::ListGroups, Priority::Normal, socket_timeout, retries);
    Ok(Built { envelope: envelope, wire: wire, permit: None })
}

// --- DescribeGroups ---

pub fn build_describe_groups<'a>(group_ids: Vec<String>, correlation_id: i32, client_id: Option<&str>,
                                 socket_timeout: Duration, retries: i32) -> Result<Built<'a>> {
    let wire = build_wire(ApiKeys::DescribeGroups, 0, correlation_id, client_id,
        |header, dst| group::encode_describe_groups(header, &group_ids, dst))?;

    let envelope = RequestEnvelope::new(correlation_id, RequestBody::DescribeGroups(group_ids), Priority::Normal, socket_timeout, retries);
    Ok(Built { envelope: envelope, wire: wire, permit: None })
}

// --- ApiVersions ---

pub fn build_api_versions<'a>(correlation_id: i32, client_id: Option<&str>, socket_timeout: Duration) -> Result<Built<'a>> {
    let wire = build_wire(ApiKeys::ApiVersions, 0, correlation_id, client_id,
        |header, dst| api_versions::encode_api_versions(header, dst))?;

    let envelope = RequestEnvelope::new(correlation_id, RequestBody::ApiVersions, Priority::Expedited, socket_timeout, NO_RETRIES);
    Ok(Built { envelope: envelope, wire: wire, permit: None })
}

// --- SaslHandshake ---

pub fn build_sasl_handshake<'a>(mechanism: String, correlation_id: i32, client_id: Option<&str>,
                                socket_timeout: Duration, dynamic_versioning: bool) -> Result<Built<'a>> {
    let deadline = sasl::handshake_deadline(socket_timeout, dynamic_versioning);

    let wire = build_wire(ApiKeys::SaslHandshake, 0, correlation_id, client_id,
        |header, dst| sasl::encode_sasl_handshake(header, &mechanism, dst))?;

    let envelope = RequestEnvelope::new(correlation_id, RequestBody::SaslHandshake(mechanism), Priority::Expedited, deadline, NO_RETRIES);
    Ok(Built { envelope: envelope, wire: wire, permit: None })
}

// --- Admin: CreateTopics, DeleteTopics, CreatePartitions, AlterConfigs, DescribeConfigs ---

pub fn build_create_topics<'a>(topics: Vec<NewTopic>, timeout_ms: i32, validate_only: bool, api_version: i16,
                               table: &ApiVersionTable, correlation_id: i32, client_id: Option<&str>,
                               socket_timeout: Duration, retries: i32) -> Result<Built<'a>> {
    let wire = build_wire(ApiKeys::CreateTopics, api_version, correlation_id, client_id,
        |header, dst| admin::encode_create_topics(header, &topics, timeout_ms, validate_only, api_version, table, dst))?;

    let deadline = admin::op_deadline(Duration::from_millis(timeout_ms.max(0) as u64), socket_timeout);
    let envelope = RequestEnvelope::new(correlation_id, RequestBody::Admin(wire.clone()), Priority::Normal, deadline, retries);
    Ok(Built { envelope: envelope, wire: wire, permit: None })
}

pub fn build_delete_topics<'a>(topics: Vec<String>, timeout_ms: i32, api_version: i16, table: &ApiVersionTable,
                               correlation_id: i32, client_id: Option<&str>, socket_timeout: Duration,
                               retries: i32) -> Result<Built<'a>> {
    let wire = build_wire(ApiKeys::DeleteTopics, api_version, correlation_id, client_id,
        |header, dst| admin::encode_delete_topics(header, &topics, timeout_ms, api_version, table, dst))?;

    let deadline = admin::op_deadline(Duration::from_millis(timeout_ms.max(0) as u64), socket_timeout);
    let envelope = RequestEnvelope::new(correlation_id, RequestBody::Admin(wire.clone()), Priority::Normal, deadline, retries);
    Ok(Built { envelope: envelope, wire: wire, permit: None })
}

pub fn build_create_partitions<'a>(topics: Vec<NewPartitions>, timeout_ms: i32, validate_only: bool, api_version: i16,
                                   table: &ApiVersionTable, correlation_id: i32, client_id: Option<&str>,
                                   socket_timeout: Duration, retries: i32) -> Result<Built<'a>> {
    let wire = build_wire(ApiKeys::CreatePartitions, api_version, correlation_id, client_id,
        |header, dst| admin::encode_create_partitions(header, &topics, timeout_ms, validate_only, api_version, table, dst))?;

    let deadline = admin::op_deadline(Duration::from_millis(timeout_ms.max(0) as u64), socket_timeout);
    let envelope = RequestEnvelope::new(correlation_id, RequestBody::Admin(wire.clone()), Priority::Normal, deadline, retries);
    Ok(Built { envelope: envelope, wire: wire, permit: None })
}

pub fn build_alter_configs<'a>(resources: Vec<ConfigResource>, validate_only: bool, incremental: bool, api_version: i16,
                               table: &ApiVersionTable, correlation_id: i32, client_id: Option<&str>,
                               socket_timeout: Duration, retries: i32) -> Result<Built<'a>> {
    let wire = build_wire(ApiKeys::AlterConfigs, api_version, correlation_id, client_id,
        |header, dst| admin::encode_alter_configs(header, &resources, validate_only, incremental, api_version, table, dst))?;

    let envelope = RequestEnvelope::new(correlation_id, RequestBody::Admin(wire.clone()), Priority::Normal, socket_timeout, retries);
    Ok(Built { envelope: envelope, wire: wire, permit: None })
}

pub fn build_describe_configs<'a>(resources: Vec<DescribeConfigsResource>, api_version: i16, table: &ApiVersionTable,
                                  correlation_id: i32, client_id: Option<&str>, socket_timeout: Duration,
                                  retries: i32) -> Result<Built<'a>> {
    let wire = build_wire(ApiKeys::DescribeConfigs, api_version, correlation_id, client_id,
        |header, dst| admin::encode_describe_configs(header, &resources, api_version, table, dst))?;

    let envelope = RequestEnvelope::new(correlation_id, RequestBody::Admin(wire.clone()), Priority::Normal, socket_timeout, retries);
    Ok(Built { envelope: envelope, wire: wire, permit: None })
}

#[cfg(test)]
mod tests {
    use protocol::metadata::MetadataRequest;
    use protocol::offset_commit::OffsetCommitPartition;
    use protocol::offset_fetch::{OffsetFetchPartitionRequest, INVALID};
    use protocol::produce::ProduceRequest;
    use version::BrokerApiVersion;
    use super::*;

    #[test]
    fn unforced_full_metadata_request_is_suppressed_behind_one_in_flight() {
        let sup = FullRequestSuppressor::new();
        let first = build_metadata(MetadataRequest { topics: None }, 1, 1, Some("c"), Duration::from_secs(5), 0, false, &sup).unwrap();

        let second = build_metadata(MetadataRequest { topics: None }, 1, 2, Some("c"), Duration::from_secs(5), 0, false, &sup);
        assert!(second.is_err());

        drop(first);
        let third = build_metadata(MetadataRequest { topics: None }, 1, 3, Some("c"), Duration::from_secs(5), 0, false, &sup);
        assert!(third.is_ok());
    }

    #[test]
    fn forced_full_metadata_request_bypasses_suppression() {
        let sup = FullRequestSuppressor::new();
        let _first = build_metadata(MetadataRequest { topics: None }, 1, 1, Some("c"), Duration::from_secs(5), 0, false, &sup).unwrap();
        let forced = build_metadata(MetadataRequest { topics: None }, 1, 2, Some("c"), Duration::from_secs(5), 0, true, &sup);
        assert!(forced.is_ok());
    }

    #[test]
    fn topics_and_brokers_shapes_do_not_contend() {
        let sup = FullRequestSuppressor::new();
        let _topics = build_metadata(MetadataRequest { topics: None }, 1, 1, Some("c"), Duration::from_secs(5), 0, false, &sup).unwrap();
        let brokers = build_metadata(MetadataRequest { topics: Some(vec![]) }, 1, 2, Some("c"), Duration::from_secs(5), 0, false, &sup);
        assert!(brokers.is_ok());
    }

    #[test]
    fn partial_topic_list_metadata_request_never_touches_the_suppressor() {
        let sup = FullRequestSuppressor::new();
        let a = build_metadata(MetadataRequest { topics: Some(vec!["t".to_owned()]) }, 1, 1, Some("c"), Duration::from_secs(5), 0, false, &sup).unwrap();
        let b = build_metadata(MetadataRequest { topics: Some(vec!["t".to_owned()]) }, 1, 2, Some("c"), Duration::from_secs(5), 0, false, &sup);
        assert!(a.permit.is_none());
        assert!(b.is_ok());
    }

    #[test]
    fn metadata_is_flash_priority() {
        let sup = FullRequestSuppressor::new();
        let built = build_metadata(MetadataRequest { topics: None }, 1, 1, Some("c"), Duration::from_secs(5), 0, false, &sup).unwrap();
        assert_eq!(built.envelope.priority, Priority::Expedited);
    }

    #[test]
    fn offset_fetch_skips_the_round_trip_when_every_partition_is_already_known() {
        let req = OffsetFetchRequest {
            group_id: "g".to_owned(),
            topics: vec![("t".to_owned(), vec![OffsetFetchPartitionRequest { partition: 0, cached_offset: 7 }])],
        };
        match build_offset_fetch(req, 5, Some("c"), Duration::from_secs(5), 3).unwrap() {
            Outcome::Skipped(KafkaEvent::OffsetFetch(resp)) => assert_eq!(resp.header.correlation_id, 5),
            Outcome::Send(_) => panic!("expected a skip, not a send"),
            _ => panic!("unexpected event variant"),
        }
    }

    #[test]
    fn offset_fetch_sends_when_a_partition_still_needs_a_round_trip() {
        let req = OffsetFetchRequest {
            group_id: "g".to_owned(),
            topics: vec![("t".to_owned(), vec![OffsetFetchPartitionRequest { partition: 0, cached_offset: INVALID }])],
        };
        match build_offset_fetch(req, 5, Some("c"), Duration::from_secs(5), 3).unwrap() {
            Outcome::Send(built) => assert!(!built.wire.is_empty()),
            Outcome::Skipped(_) => panic!("expected a send, not a skip"),
        }
    }

    #[test]
    fn offset_commit_skips_the_round_trip_when_every_offset_is_negative() {
        let req = OffsetCommitRequest {
            group_id: "g".to_owned(),
            generation_id: 1,
            member_id: "m".to_owned(),
            topics: vec![("t".to_owned(), vec![OffsetCommitPartition { partition: 0, offset: -1, metadata: None }])],
        };
        match build_offset_commit(req, 1, 9, Some("c"), Duration::from_secs(5), 3).unwrap() {
            Outcome::Skipped(KafkaEvent::OffsetCommit(resp)) => assert!(resp.into_result().is_ok()),
            _ => panic!("expected a skip"),
        }
    }

    #[test]
    fn join_group_deadline_adds_the_blocking_grace_window() {
        let req = JoinGroupRequest {
            group_id: "g".to_owned(),
            session_timeout_ms: 10_000,
            rebalance_timeout_ms: 20_000,
            member_id: String::new(),
            protocol_type: "consumer".to_owned(),
            protocols: vec![],
        };
        let built = build_join_group(req, 1, 1, Some("c"), 3).unwrap();
        let remaining = built.envelope.deadline - ::std::time::Instant::now();
        assert!(remaining.as_secs() >= 12 && remaining.as_secs() <= 13);
    }

    #[test]
    fn produce_acks_zero_is_never_retried() {
        let req = ProduceRequest {
            acks: 0,
            timeout_ms: 1000,
            topic: "t".to_owned(),
            partition: 0,
            message_set: Bytes::from_static(b"x"),
        };
        let built = build_produce(req, 2, 1, Some("c"), 5).unwrap();
        assert_eq!(built.envelope.retries_remaining, NO_RETRIES);
    }

    #[test]
    fn create_topics_fails_closed_on_an_unsupported_version_before_anything_is_built() {
        let table = ApiVersionTable::new(vec![]);
        let topics = vec![NewTopic { name: "t".to_owned(), num_partitions: 1, replication_factor: 1, replica_assignments: vec![], configs: vec![] }];
        let built = build_create_topics(topics, 1000, false, 0, &table, 1, Some("c"), Duration::from_secs(5), 3);
        assert!(built.is_err());
    }

    #[test]
    fn create_topics_succeeds_against_a_supporting_broker() {
        let table = ApiVersionTable::new(vec![BrokerApiVersion { api_key: ApiKeys::CreateTopics as i16, min_version: 0, max_version: 1 }]);
        let topics = vec![NewTopic { name: "t".to_owned(), num_partitions: 1, replication_factor: 1, replica_assignments: vec![], configs: vec![] }];
        let built = build_create_topics(topics, 1000, false, 0, &table, 1, Some("c"), Duration::from_secs(5), 3).unwrap();
        assert!(!built.wire.is_empty());
    }
}
