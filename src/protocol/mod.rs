//! C5/C6 — per-API request encoders and response decoders/handlers.
//!
//! Each submodule owns one API family: it defines the request/response
//! data types, a pure `encode_*` function (byte-exact per version, C5), a
//! `decode_*` function built from `nom` combinators (C6, decode half), and
//! a `handle_*` function that runs the decoded result through the
//! classifier (`classify`) and the retry/refresh driver (`driver`, C6
//! handler half + C7 + C8).

use bytes::{BigEndian, BufMut, BytesMut};

use errors::{ErrorKind, Result};
use wire::WriteExt;

pub mod metadata;
pub mod offset;
pub mod offset_fetch;
pub mod offset_commit;
pub mod produce;
pub mod group;
pub mod api_versions;
pub mod sasl;
pub mod admin;

pub use self::metadata::{MetadataRequest, MetadataResponse};
pub use self::offset::{OffsetPartitionRequest, OffsetRequest, OffsetResponse};
pub use self::offset_fetch::{OffsetFetchRequest, OffsetFetchResponse};
pub use self::offset_commit::{OffsetCommitPartition, OffsetCommitRequest, OffsetCommitResponse};
pub use self::produce::ProduceResponse;
pub use self::group::{DescribeGroupsResponse, GroupCoordinatorResponse, HeartbeatResponse,
                      JoinGroupRequest, JoinGroupResponse, LeaveGroupResponse,
                      ListGroupsResponse, MemberAssignment, SyncGroupAssignment,
                      SyncGroupResponse, TopicPartitionAssignment};
pub use self::api_versions::{ApiVersionsResponse, SupportedApiVersion};

/// The subset of Kafka API keys this engine knows how to build and parse.
/// Numeric values follow the real Kafka protocol's assignment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum ApiKeys {
    Produce = 0,
    Offsets = 2,
    Metadata = 3,
    OffsetCommit = 8,
    OffsetFetch = 9,
    GroupCoordinator = 10,
    JoinGroup = 11,
    Heartbeat = 12,
    LeaveGroup = 13,
    SyncGroup = 14,
    DescribeGroups = 15,
    ListGroups = 16,
    SaslHandshake = 17,
    ApiVersions = 18,
    CreateTopics = 19,
    DeleteTopics = 20,
    DescribeConfigs = 32,
    AlterConfigs = 33,
    CreatePartitions = 37,
}

impl ApiKeys {
    pub fn from_i16(v: i16) -> Option<ApiKeys> {
        match v {
            0 => Some(ApiKeys::Produce),
            2 => Some(ApiKeys::Offsets),
            3 => Some(ApiKeys::Metadata),
            8 => Some(ApiKeys::OffsetCommit),
            9 => Some(ApiKeys::OffsetFetch),
            10 => Some(ApiKeys::GroupCoordinator),
            11 => Some(ApiKeys::JoinGroup),
            12 => Some(ApiKeys::Heartbeat),
            13 => Some(ApiKeys::LeaveGroup),
            14 => Some(ApiKeys::SyncGroup),
            15 => Some(ApiKeys::DescribeGroups),
            16 => Some(ApiKeys::ListGroups),
            17 => Some(ApiKeys::SaslHandshake),
            18 => Some(ApiKeys::ApiVersions),
            19 => Some(ApiKeys::CreateTopics),
            20 => Some(ApiKeys::DeleteTopics),
            32 => Some(ApiKeys::DescribeConfigs),
            33 => Some(ApiKeys::AlterConfigs),
            37 => Some(ApiKeys::CreatePartitions),
            _ => None,
        }
    }
}

/// `i16 ApiKey, i16 ApiVersion, i32 CorrelationId, nullable string ClientId`.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestHeader<'a> {
    pub api_key: ApiKeys,
    pub api_version: i16,
    pub correlation_id: i32,
    pub client_id: Option<&'a str>,
}

impl<'a> RequestHeader<'a> {
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        dst.put_i16::<BigEndian>(self.api_key as i16);
        dst.put_i16::<BigEndian>(self.api_version);
        dst.put_i32::<BigEndian>(self.correlation_id);
        dst.put_str::<BigEndian, _>(self.client_id)
    }
}

/// `i32 CorrelationId` — the only field every response shares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseHeader {
    pub correlation_id: i32,
}

named!(pub parse_response_header<ResponseHeader>,
    do_parse!(
        correlation_id: ::nom::be_i32
     >> (ResponseHeader { correlation_id: correlation_id })
    )
);

/// Fails decoding with `BadMsg` unless `cond` holds; used by handlers that
/// only understand a fixed topic/partition arity (see
/// `produce::handle_produce`).
pub fn require(cond: bool, reason: &str) -> Result<()> {
    if cond {
        Ok(())
    } else {
        bail!(ErrorKind::BadMsg(reason.to_owned()));
    }
}
