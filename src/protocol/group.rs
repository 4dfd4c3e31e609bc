//! Consumer group membership APIs: GroupCoordinator (10), JoinGroup (11),
//! Heartbeat (12), LeaveGroup (13), SyncGroup (14), DescribeGroups (15),
//! ListGroups (16).
//!
//! Member and assignment metadata (`group_protocols`, `member_assignment`)
//! are carried as opaque byte blobs — the protocol selection and
//! partition-assignment algorithms that produce and consume them belong to
//! an external collaborator, not this wire layer.

use bytes::{BigEndian, Bytes, BufMut, BytesMut};

use envelope::EnvelopeState;
use errors::{ErrorKind, KafkaCode, Result};
use protocol::{parse_response_header, RequestHeader, ResponseHeader};
use wire::{parse_array_count, parse_bytes, parse_string, WriteExt};

// --- GroupCoordinator ---

pub fn encode_group_coordinator(header: &RequestHeader, group_id: &str, dst: &mut BytesMut) -> Result<()> {
    header.encode(dst)?;
    dst.put_str::<BigEndian, _>(Some(group_id))?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupCoordinatorResponse {
    pub header: ResponseHeader,
    pub error_code: KafkaCode,
    pub coordinator_id: i32,
    pub coordinator_host: String,
    pub coordinator_port: i32,
}

named!(pub decode_group_coordinator<GroupCoordinatorResponse>,
    do_parse!(
        header: parse_response_header
     >> error_code: ::nom::be_i16
     >> coordinator_id: ::nom::be_i32
     >> coordinator_host: parse_string
     >> coordinator_port: ::nom::be_i32
     >> (GroupCoordinatorResponse {
            header: header,
            error_code: KafkaCode::from_wire(error_code),
            coordinator_id: coordinator_id,
            coordinator_host: coordinator_host,
            coordinator_port: coordinator_port,
        })
    )
);

// --- JoinGroup ---

#[derive(Debug, Clone, PartialEq)]
pub struct GroupProtocol {
    pub name: String,
    pub metadata: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinGroupRequest {
    pub group_id: String,
    pub session_timeout_ms: i32,
    pub rebalance_timeout_ms: i32,
    /// Empty string requests a freshly assigned member id.
    pub member_id: String,
    pub protocol_type: String,
    pub protocols: Vec<GroupProtocol>,
}

pub fn encode_join_group(header: &RequestHeader, req: &JoinGroupRequest, api_version: i16, dst: &mut BytesMut) -> Result<()> {
    header.encode(dst)?;
    dst.put_str::<BigEndian, _>(Some(&req.group_id))?;
    dst.put_i32::<BigEndian>(req.session_timeout_ms);
    if api_version >= 1 {
        dst.put_i32::<BigEndian>(req.rebalance_timeout_ms);
    }
    dst.put_str::<BigEndian, _>(Some(&req.member_id))?;
    dst.put_str::<BigEndian, _>(Some(&req.protocol_type))?;

    dst.put_i32::<BigEndian>(req.protocols.len() as i32);
    for p in &req.protocols {
        dst.put_str::<BigEndian, _>(Some(&p.name))?;
        dst.put_bytes::<BigEndian, _>(Some(&p.metadata[..]))?;
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinGroupMember {
    pub member_id: String,
    pub metadata: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinGroupResponse {
    pub header: ResponseHeader,
    pub error_code: KafkaCode,
    pub generation_id: i32,
    pub group_protocol: String,
    pub leader_id: String,
    pub member_id: String,
    /// Non-empty only for the member elected leader of the group.
    pub members: Vec<JoinGroupMember>,
}

impl JoinGroupResponse {
    pub fn is_leader(&self) -> bool {
        self.leader_id == self.member_id
    }
}

named!(parse_join_group_member<JoinGroupMember>,
    do_parse!(
        member_id: parse_string
     >> metadata: parse_bytes
     >> (JoinGroupMember { member_id: member_id, metadata: Bytes::from(metadata.unwrap_or_default()) })
    )
);

named!(pub decode_join_group<JoinGroupResponse>,
    do_parse!(
        header: parse_response_header
     >> error_code: ::nom::be_i16
     >> generation_id: ::nom::be_i32
     >> group_protocol: parse_string
     >> leader_id: parse_string
     >> member_id: parse_string
     >> members: length_count!(parse_array_count, parse_join_group_member)
     >> (JoinGroupResponse {
            header: header,
            error_code: KafkaCode::from_wire(error_code),
            generation_id: generation_id,
            group_protocol: group_protocol,
            leader_id: leader_id,
            member_id: member_id,
            members: members,
        })
    )
);

// --- SyncGroup ---

/// A topic and the partitions assigned to a member within it — one entry
/// of the nested assignment's topic-grouped partition list.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicPartitionAssignment {
    pub topic: String,
    pub partitions: Vec<i32>,
}

/// The `member_state` nested envelope SyncGroup carries per assignment:
/// `i16 version = 0`, a topic-grouped partition list, then opaque
/// `user_data` the assignor round-trips without interpreting.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberAssignment {
    pub version: i16,
    pub partition_assignment: Vec<TopicPartitionAssignment>,
    pub user_data: Option<Bytes>,
}

impl MemberAssignment {
    /// Builds the nested envelope into its own scratch buffer, ready to be
    /// appended as the `bytes member_state` field of a `SyncGroupAssignment`.
    pub fn encode(&self) -> Result<Bytes> {
        let mut scratch = BytesMut::with_capacity(64);
        scratch.put_i16::<BigEndian>(self.version);
        scratch.put_i32::<BigEndian>(self.partition_assignment.len() as i32);
        for tp in &self.partition_assignment {
            scratch.put_str::<BigEndian, _>(Some(&tp.topic))?;
            scratch.put_i32::<BigEndian>(tp.partitions.len() as i32);
            for &p in &tp.partitions {
                scratch.put_i32::<BigEndian>(p);
            }
        }
        scratch.put_bytes::<BigEndian, _>(self.user_data.as_ref().map(|b| &b[..]))?;
        Ok(scratch.freeze())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncGroupAssignment {
    pub member_id: String,
    pub assignment: MemberAssignment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncGroupRequest {
    pub group_id: String,
    pub generation_id: i32,
    pub member_id: String,
    /// Non-empty only when this client was elected leader; a follower
    /// sends an empty list and receives its assignment back from the
    /// broker instead.
    pub group_assignment: Vec<SyncGroupAssignment>,
}

pub fn encode_sync_group(header: &RequestHeader, req: &SyncGroupRequest, dst: &mut BytesMut) -> Result<()> {
    header.encode(dst)?;
    dst.put_str::<BigEndian, _>(Some(&req.group_id))?;
    dst.put_i32::<BigEndian>(req.generation_id);
    dst.put_str::<BigEndian, _>(Some(&req.member_id))?;

    dst.put_i32::<BigEndian>(req.group_assignment.len() as i32);
    for a in &req.group_assignment {
        dst.put_str::<BigEndian, _>(Some(&a.member_id))?;
        let member_state = a.assignment.encode()?;
        dst.put_bytes::<BigEndian, _>(Some(&member_state[..]))?;
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncGroupResponse {
    pub header: ResponseHeader,
    pub error_code: KafkaCode,
    pub member_assignment: Bytes,
}

named!(pub decode_sync_group<SyncGroupResponse>,
    do_parse!(
        header: parse_response_header
     >> error_code: ::nom::be_i16
     >> member_assignment: parse_bytes
     >> (SyncGroupResponse {
            header: header,
            error_code: KafkaCode::from_wire(error_code),
            member_assignment: Bytes::from(member_assignment.unwrap_or_default()),
        })
    )
);

/// A SyncGroup reply is only meaningful while the envelope that sent it is
/// still waiting on it. A reply that arrives after the envelope has moved
/// past `WaitSync` (the group already rebalanced again, or the caller gave
/// up) is stale and must be discarded rather than applied — applying it
/// would hand the caller an assignment for a generation it has already
/// left behind.
pub fn accept_sync_group_reply(state: EnvelopeState) -> bool {
    state == EnvelopeState::WaitSync
}

// --- Heartbeat ---

#[derive(Debug, Clone, PartialEq)]
pub struct HeartbeatRequest {
    pub group_id: String,
    pub generation_id: i32,
    pub member_id: String,
}

pub fn encode_heartbeat(header: &RequestHeader, req: &HeartbeatRequest, dst: &mut BytesMut) -> Result<()> {
    header.encode(dst)?;
    dst.put_str::<BigEndian, _>(Some(&req.group_id))?;
    dst.put_i32::<BigEndian>(req.generation_id);
    dst.put_str::<BigEndian, _>(Some(&req.member_id))?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeartbeatResponse {
    pub header: ResponseHeader,
    pub error_code: KafkaCode,
}

named!(pub decode_heartbeat<HeartbeatResponse>,
    do_parse!(
        header: parse_response_header
     >> error_code: ::nom::be_i16
     >> (HeartbeatResponse { header: header, error_code: KafkaCode::from_wire(error_code) })
    )
);

// --- LeaveGroup ---

pub fn encode_leave_group(header: &RequestHeader, group_id: &str, member_id: &str, dst: &mut BytesMut) -> Result<()> {
    header.encode(dst)?;
    dst.put_str::<BigEndian, _>(Some(group_id))?;
    dst.put_str::<BigEndian, _>(Some(member_id))?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaveGroupResponse {
    pub header: ResponseHeader,
    pub error_code: KafkaCode,
}

named!(pub decode_leave_group<LeaveGroupResponse>,
    do_parse!(
        header: parse_response_header
     >> error_code: ::nom::be_i16
     >> (LeaveGroupResponse { header: header, error_code: KafkaCode::from_wire(error_code) })
    )
);

// --- ListGroups ---

pub fn encode_list_groups(header: &RequestHeader, dst: &mut BytesMut) -> Result<()> {
    header.encode(dst)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListedGroup {
    pub group_id: String,
    pub protocol_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListGroupsResponse {
    pub header: ResponseHeader,
    pub error_code: KafkaCode,
    pub groups: Vec<ListedGroup>,
}

named!(parse_listed_group<ListedGroup>,
    do_parse!(
        group_id: parse_string
     >> protocol_type: parse_string
     >> (ListedGroup { group_id: group_id, protocol_type: protocol_type })
    )
);

named!(pub decode_list_groups<ListGroupsResponse>,
    do_parse!(
        header: parse_response_header
     >> error_code: ::nom::be_i16
     >> groups: length_count!(parse_array_count, parse_listed_group)
     >> (ListGroupsResponse { header: header, error_code: KafkaCode::from_wire(error_code), groups: groups })
    )
);

// --- DescribeGroups ---

pub fn encode_describe_groups(header: &RequestHeader, group_ids: &[String], dst: &mut BytesMut) -> Result<()> {
    header.encode(dst)?;
    dst.put_i32::<BigEndian>(group_ids.len() as i32);
    for id in group_ids {
        dst.put_str::<BigEndian, _>(Some(id))?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct DescribedMember {
    pub member_id: String,
    pub client_id: String,
    pub client_host: String,
    pub member_metadata: Bytes,
    pub member_assignment: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DescribedGroup {
    pub error_code: KafkaCode,
    pub group_id: String,
    pub state: String,
    pub protocol_type: String,
    pub protocol: String,
    pub members: Vec<DescribedMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DescribeGroupsResponse {
    pub header: ResponseHeader,
    pub groups: Vec<DescribedGroup>,
}

named!(parse_described_member<DescribedMember>,
    do_parse!(
        member_id: parse_string
     >> client_id: parse_string
     >> client_host: parse_string
     >> member_metadata: parse_bytes
     >> member_assignment: parse_bytes
     >> (DescribedMember {
            member_id: member_id,
            client_id: client_id,
            client_host: client_host,
            member_metadata: Bytes::from(member_metadata.unwrap_or_default()),
            member_assignment: Bytes::from(member_assignment.unwrap_or_default()),
        })
    )
);

named!(parse_described_group<DescribedGroup>,
    do_parse!(
        error_code: ::nom::be_i16
     >> group_id: parse_string
     >> state: parse_string
     >> protocol_type: parse_string
     >> protocol: parse_string
     >> members: length_count!(parse_array_count, parse_described_member)
     >> (DescribedGroup {
            error_code: KafkaCode::from_wire(error_code),
            group_id: group_id,
            state: state,
            protocol_type: protocol_type,
            protocol: protocol,
            members: members,
        })
    )
);

named!(pub decode_describe_groups<DescribeGroupsResponse>,
    do_parse!(
        header: parse_response_header
     >> groups: length_count!(parse_array_count, parse_described_group)
     >> (DescribeGroupsResponse { header: header, groups: groups })
    )
);
