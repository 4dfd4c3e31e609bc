//! Cluster administration: CreateTopics (19), DeleteTopics (20),
//! CreatePartitions (37), AlterConfigs (33), DescribeConfigs (32).
//!
//! These are rarely-used, broad-surface APIs whose reply shapes differ a
//! lot by version and whose callers are almost always tooling rather than
//! the hot path. Rather than model every version's response fields, this
//! module decodes only the response header and hands the caller the raw
//! remaining buffer — the caller, not this engine, knows which admin
//! operation it issued and can apply the matching `nom` parser to it
//! directly.
//!
//! AlterConfigs's incremental variant (deleting individual config keys
//! rather than replacing the whole set) is only well-formed from
//! ApiVersion 1 onward; `encode_alter_configs` conservatively rejects it on
//! `v = 0` even though some broker builds silently tolerate it. FIXME:
//! revisit once the collaborator that calls this can tell us the true
//! per-broker behavior instead of going by the documented version gate.

use std::time::Duration;

use bytes::{BigEndian, Bytes, BufMut, BytesMut};

use errors::{ErrorKind, Result};
use protocol::{parse_response_header, require, ApiKeys, RequestHeader, ResponseHeader};
use version::{negotiate, ApiVersionTable};
use wire::WriteExt;

#[derive(Debug, Clone, PartialEq)]
pub struct NewTopic {
    pub name: String,
    pub num_partitions: i32,
    pub replication_factor: i16,
    pub replica_assignments: Vec<(i32, Vec<i32>)>,
    pub configs: Vec<(String, String)>,
}

pub fn encode_create_topics(header: &RequestHeader, topics: &[NewTopic], timeout_ms: i32, validate_only: bool, api_version: i16, table: &ApiVersionTable, dst: &mut BytesMut) -> Result<()> {
    negotiate(ApiKeys::CreateTopics, 0, api_version, table)?;

    header.encode(dst)?;

    dst.put_i32::<BigEndian>(topics.len() as i32);
    for t in topics {
        dst.put_str::<BigEndian, _>(Some(&t.name))?;
        dst.put_i32::<BigEndian>(t.num_partitions);
        dst.put_i16::<BigEndian>(t.replication_factor);

        dst.put_i32::<BigEndian>(t.replica_assignments.len() as i32);
        for &(partition, ref replicas) in &t.replica_assignments {
            dst.put_i32::<BigEndian>(partition);
            dst.put_i32::<BigEndian>(replicas.len() as i32);
            for &r in replicas {
                dst.put_i32::<BigEndian>(r);
            }
        }

        dst.put_i32::<BigEndian>(t.configs.len() as i32);
        for &(ref key, ref value) in &t.configs {
            dst.put_str::<BigEndian, _>(Some(key))?;
            dst.put_str::<BigEndian, _>(Some(value))?;
        }
    }

    dst.put_i32::<BigEndian>(timeout_ms);
    if api_version >= 1 {
        dst.put_i8(validate_only as i8);
    }

    Ok(())
}

pub fn encode_delete_topics(header: &RequestHeader, topics: &[String], timeout_ms: i32, api_version: i16, table: &ApiVersionTable, dst: &mut BytesMut) -> Result<()> {
    negotiate(ApiKeys::DeleteTopics, 0, api_version, table)?;

    header.encode(dst)?;
    dst.put_i32::<BigEndian>(topics.len() as i32);
    for t in topics {
        dst.put_str::<BigEndian, _>(Some(t))?;
    }
    dst.put_i32::<BigEndian>(timeout_ms);
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPartitions {
    pub topic: String,
    pub new_total_count: i32,
    pub assignments: Vec<Vec<i32>>,
}

pub fn encode_create_partitions(header: &RequestHeader, topics: &[NewPartitions], timeout_ms: i32, validate_only: bool, api_version: i16, table: &ApiVersionTable, dst: &mut BytesMut) -> Result<()> {
    negotiate(ApiKeys::CreatePartitions, 0, api_version, table)?;

    header.encode(dst)?;

    dst.put_i32::<BigEndian>(topics.len() as i32);
    for t in topics {
        dst.put_str::<BigEndian, _>(Some(&t.topic))?;
        dst.put_i32::<BigEndian>(t.new_total_count);

        dst.put_i32::<BigEndian>(t.assignments.len() as i32);
        for assignment in &t.assignments {
            dst.put_i32::<BigEndian>(assignment.len() as i32);
            for &replica in assignment {
                dst.put_i32::<BigEndian>(replica);
            }
        }
    }

    dst.put_i32::<BigEndian>(timeout_ms);
    dst.put_i8(validate_only as i8);
    Ok(())
}

/// `None` as an entry's value means "delete this key" (the incremental
/// form); `Some(value)` sets it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigResource {
    pub resource_type: i8,
    pub resource_name: String,
    pub entries: Vec<(String, Option<String>)>,
}

pub fn encode_alter_configs(header: &RequestHeader, resources: &[ConfigResource], validate_only: bool, incremental: bool, api_version: i16, table: &ApiVersionTable, dst: &mut BytesMut) -> Result<()> {
    negotiate(ApiKeys::AlterConfigs, 0, api_version, table)?;
    require(!incremental || api_version >= 1, "incremental AlterConfigs requires ApiVersion >= 1")?;

    header.encode(dst)?;

    dst.put_i32::<BigEndian>(resources.len() as i32);
    for r in resources {
        dst.put_i8(r.resource_type);
        dst.put_str::<BigEndian, _>(Some(&r.resource_name))?;

        dst.put_i32::<BigEndian>(r.entries.len() as i32);
        for &(ref key, ref value) in &r.entries {
            dst.put_str::<BigEndian, _>(Some(key))?;
            dst.put_str::<BigEndian, _>(value.as_ref())?;
        }
    }

    dst.put_i8(validate_only as i8);
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct DescribeConfigsResource {
    pub resource_type: i8,
    pub resource_name: String,
    /// `None` requests every config key for this resource.
    pub config_names: Option<Vec<String>>,
}

pub fn encode_describe_configs(header: &RequestHeader, resources: &[DescribeConfigsResource], api_version: i16, table: &ApiVersionTable, dst: &mut BytesMut) -> Result<()> {
    negotiate(ApiKeys::DescribeConfigs, 0, api_version, table)?;

    header.encode(dst)?;

    dst.put_i32::<BigEndian>(resources.len() as i32);
    for r in resources {
        dst.put_i8(r.resource_type);
        dst.put_str::<BigEndian, _>(Some(&r.resource_name))?;
        match r.config_names {
            None => dst.put_i32::<BigEndian>(-1),
            Some(ref names) => {
                dst.put_i32::<BigEndian>(names.len() as i32);
                for n in names {
                    dst.put_str::<BigEndian, _>(Some(n))?;
                }
            }
        }
    }

    Ok(())
}

/// The deadline for an operation carrying its own `op_timeout`: the socket
/// timeout, unless `op_timeout` is larger, in which case the deadline is
/// extended to `op_timeout + 1s` so the broker's own timeout always fires
/// first.
pub fn op_deadline(op_timeout: Duration, socket_timeout: Duration) -> Duration {
    if op_timeout > socket_timeout {
        op_timeout + Duration::from_secs(1)
    } else {
        socket_timeout
    }
}

/// The common reply shape: a correlation id followed by whatever the
/// specific admin operation's reply body looks like. Callers apply their
/// own `nom` parser to `body`.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminReply {
    pub header: ResponseHeader,
    pub body: Bytes,
}

pub fn decode_admin_reply(input: &[u8]) -> Result<AdminReply> {
    let parsed = do_parse!(input,
        header: parse_response_header
     >> body: ::nom::rest
     >> (AdminReply { header: header, body: Bytes::from(body) })
    );

    match parsed {
        ::nom::IResult::Done(_, reply) => Ok(reply),
        ::nom::IResult::Incomplete(_) => bail!(ErrorKind::BadMsg("truncated admin response".to_owned())),
        ::nom::IResult::Error(e) => bail!(e),
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use version::BrokerApiVersion;
    use super::*;

    fn header(version: i16) -> RequestHeader<'static> {
        RequestHeader { api_key: ApiKeys::AlterConfigs, api_version: version, correlation_id: 1, client_id: Some("c") }
    }

    /// A table advertising every admin API this module supports, versions
    /// 0 through 1, for tests that aren't themselves exercising negotiation.
    fn admin_table() -> ApiVersionTable {
        ApiVersionTable::new(vec![
            BrokerApiVersion { api_key: ApiKeys::CreateTopics as i16, min_version: 0, max_version: 1 },
            BrokerApiVersion { api_key: ApiKeys::DeleteTopics as i16, min_version: 0, max_version: 1 },
            BrokerApiVersion { api_key: ApiKeys::CreatePartitions as i16, min_version: 0, max_version: 1 },
            BrokerApiVersion { api_key: ApiKeys::AlterConfigs as i16, min_version: 0, max_version: 1 },
            BrokerApiVersion { api_key: ApiKeys::DescribeConfigs as i16, min_version: 0, max_version: 1 },
        ])
    }

    #[test]
    fn incremental_alter_configs_rejected_below_v1() {
        let resources = vec![ConfigResource { resource_type: 2, resource_name: "t".to_owned(), entries: vec![("x".to_owned(), None)] }];
        let mut buf = BytesMut::with_capacity(64);
        assert!(encode_alter_configs(&header(0), &resources, false, true, 0, &admin_table(), &mut buf).is_err());
    }

    #[test]
    fn incremental_alter_configs_allowed_from_v1() {
        let resources = vec![ConfigResource { resource_type: 2, resource_name: "t".to_owned(), entries: vec![("x".to_owned(), None)] }];
        let mut buf = BytesMut::with_capacity(64);
        assert!(encode_alter_configs(&header(1), &resources, false, true, 1, &admin_table(), &mut buf).is_ok());
    }

    #[test]
    fn alter_configs_rejects_an_unsupported_version() {
        let resources = vec![ConfigResource { resource_type: 2, resource_name: "t".to_owned(), entries: vec![] }];
        let table = ApiVersionTable::new(vec![]);
        let mut buf = BytesMut::with_capacity(64);
        assert!(encode_alter_configs(&header(0), &resources, false, false, 0, &table, &mut buf).is_err());
    }

    #[test]
    fn create_topics_rejects_an_unsupported_version() {
        let topics = vec![NewTopic { name: "t".to_owned(), num_partitions: 1, replication_factor: 1, replica_assignments: vec![], configs: vec![] }];
        let table = ApiVersionTable::new(vec![]);
        let mut buf = BytesMut::with_capacity(64);
        assert!(encode_create_topics(&header(0), &topics, 1000, false, 0, &table, &mut buf).is_err());
    }

    #[test]
    fn create_topics_succeeds_when_the_broker_supports_it() {
        let topics = vec![NewTopic { name: "t".to_owned(), num_partitions: 1, replication_factor: 1, replica_assignments: vec![], configs: vec![] }];
        let mut buf = BytesMut::with_capacity(64);
        assert!(encode_create_topics(&header(0), &topics, 1000, false, 0, &admin_table(), &mut buf).is_ok());
    }

    #[test]
    fn delete_topics_rejects_an_unsupported_version() {
        let table = ApiVersionTable::new(vec![]);
        let mut buf = BytesMut::with_capacity(64);
        assert!(encode_delete_topics(&header(0), &["t".to_owned()], 1000, 0, &table, &mut buf).is_err());
    }

    #[test]
    fn create_partitions_rejects_an_unsupported_version() {
        let topics = vec![NewPartitions { topic: "t".to_owned(), new_total_count: 3, assignments: vec![] }];
        let table = ApiVersionTable::new(vec![]);
        let mut buf = BytesMut::with_capacity(64);
        assert!(encode_create_partitions(&header(0), &topics, 1000, false, 0, &table, &mut buf).is_err());
    }

    #[test]
    fn describe_configs_requires_broker_support() {
        let table = ApiVersionTable::new(vec![]);
        let resources = vec![DescribeConfigsResource { resource_type: 2, resource_name: "t".to_owned(), config_names: None }];
        let mut buf = BytesMut::with_capacity(64);
        assert!(encode_describe_configs(&header(0), &resources, 0, &table, &mut buf).is_err());
    }

    #[test]
    fn op_deadline_extends_past_a_longer_op_timeout() {
        let d = op_deadline(Duration::from_secs(20), Duration::from_secs(5));
        assert_eq!(d, Duration::from_secs(21));
    }

    #[test]
    fn op_deadline_keeps_socket_timeout_when_it_is_already_longer() {
        let d = op_deadline(Duration::from_secs(2), Duration::from_secs(5));
        assert_eq!(d, Duration::from_secs(5));
    }

    #[test]
    fn decode_admin_reply_hands_back_the_raw_remaining_body() {
        let data: Vec<u8> = vec![0, 0, 0, 9, 1, 2, 3];
        let reply = decode_admin_reply(&data).unwrap();
        assert_eq!(reply.header.correlation_id, 9);
        assert_eq!(&reply.body[..], &[1, 2, 3]);
    }

    #[test]
    fn describe_configs_null_names_requests_every_key() {
        let table = ApiVersionTable::new(vec![BrokerApiVersion { api_key: ApiKeys::DescribeConfigs as i16, min_version: 0, max_version: 1 }]);
        let resources = vec![DescribeConfigsResource { resource_type: 2, resource_name: "t".to_owned(), config_names: None }];
        let mut buf = BytesMut::with_capacity(64);
        encode_describe_configs(&header(0), &resources, 0, &table, &mut buf).unwrap();
        assert_eq!(&buf[buf.len() - 4..], &[0xff, 0xff, 0xff, 0xff]);
    }
}
