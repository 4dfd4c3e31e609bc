//! Produce (ApiKey 0).
//!
//! The message-set itself (record batching, compression, CRCs) is built by
//! an external collaborator; this module only carries an already-encoded
//! message-set buffer across the wire for a single topic/partition —
//! `handle_produce` rejects anything else via `require()`, matching the
//! one-topic-one-partition arity this engine's callers always use.
//!
//! `acks = 0` means the broker never sends a reply at all (`NoResponse`);
//! the caller must know this before it builds a reply route; trying to
//! wait on a reply after an acks-0 send would hang forever. The request
//! deadline is the broker-side `timeout_ms`, capped at `i32::MAX`; if that
//! timeout was already spent when the request was built, a 100ms grace
//! window is granted instead so the request still goes out once.

use std::time::Duration;

use bytes::{BigEndian, Bytes, BufMut, BytesMut};

use errors::{ErrorKind, KafkaCode, Result};
use protocol::{parse_response_header, require, RequestHeader, ResponseHeader};
use wire::{parse_array_count, parse_string, WriteExt};

const GRACE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct ProduceRequest {
    pub acks: i16,
    pub timeout_ms: i32,
    pub topic: String,
    pub partition: i32,
    pub message_set: Bytes,
}

impl ProduceRequest {
    pub fn expects_response(&self) -> bool {
        self.acks != 0
    }

    /// The caller-side deadline for this request: the broker's own timeout,
    /// capped to a value it can represent. If the timeout has already
    /// elapsed (`timeout_ms <= 0` — the first message in the batch was
    /// already expired when this request was built), a fixed grace window
    /// is granted instead so the request still goes out once rather than
    /// being born already-expired.
    pub fn deadline(&self) -> Duration {
        let capped = (self.timeout_ms.max(0) as u64).min(i32::max_value() as u64);
        if self.timeout_ms <= 0 {
            Duration::from_millis(capped) + GRACE
        } else {
            Duration::from_millis(capped)
        }
    }
}

pub fn encode_produce(header: &RequestHeader, req: &ProduceRequest, dst: &mut BytesMut) -> Result<()> {
    header.encode(dst)?;
    dst.put_i16::<BigEndian>(req.acks);
    dst.put_i32::<BigEndian>(req.timeout_ms);

    dst.put_i32::<BigEndian>(1); // TopicArrayCnt
    dst.put_str::<BigEndian, _>(Some(&req.topic))?;
    dst.put_i32::<BigEndian>(1); // PartitionArrayCnt
    dst.put_i32::<BigEndian>(req.partition);
    dst.put_i32::<BigEndian>(req.message_set.len() as i32);
    dst.put_slice(&req.message_set);

    Ok(())
}

/// How the caller wants per-message offsets reported back once a batch
/// lands, given only the broker's `base_offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OffsetReport {
    /// The caller only cares that the write succeeded.
    None,
    /// Report only the tail message's offset, `base_offset + count - 1`.
    TailOffset,
    /// Report one offset per message, computed as `base_offset + index`.
    PerMessage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProducePartitionResponse {
    pub partition: i32,
    pub error_code: KafkaCode,
    pub base_offset: i64,
    /// `v >= 2` only; `None` on earlier versions.
    pub log_append_time: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProduceResponse {
    pub header: ResponseHeader,
    pub topic: String,
    pub partition: ProducePartitionResponse,
    /// `v >= 1` only; `None` on `v = 0`.
    pub throttle_time_ms: Option<i32>,
}

impl ProduceResponse {
    /// Assigns per-message offsets according to `report`, given how many
    /// messages were in the batch this response covers.
    pub fn assign_offsets(&self, message_count: usize, report: OffsetReport) -> Vec<i64> {
        match report {
            OffsetReport::None => Vec::new(),
            OffsetReport::TailOffset => vec![self.partition.base_offset + message_count as i64 - 1],
            OffsetReport::PerMessage => {
                (0..message_count as i64).map(|i| self.partition.base_offset + i).collect()
            }
        }
    }
}

named_args!(parse_partition_response(api_version: i16)<ProducePartitionResponse>,
    do_parse!(
        partition: ::nom::be_i32
     >> error_code: ::nom::be_i16
     >> base_offset: ::nom::be_i64
     >> log_append_time: cond!(api_version >= 2, ::nom::be_i64)
     >> (ProducePartitionResponse {
            partition: partition,
            error_code: KafkaCode::from_wire(error_code),
            base_offset: base_offset,
            log_append_time: log_append_time,
        })
    )
);

pub fn decode_produce(input: &[u8], api_version: i16) -> Result<ProduceResponse> {
    let parsed = do_parse!(input,
        header: parse_response_header
     >> verify!(::nom::be_i32, |c: i32| c == 1) // TopicArrayCnt must be exactly 1
     >> topic: parse_string
     >> verify!(::nom::be_i32, |c: i32| c == 1) // PartitionArrayCnt must be exactly 1
     >> partition: call!(parse_partition_response, api_version)
     >> throttle_time_ms: cond!(api_version >= 1, ::nom::be_i32)
     >> (ProduceResponse { header: header, topic: topic, partition: partition, throttle_time_ms: throttle_time_ms })
    );

    match parsed {
        ::nom::IResult::Done(_, resp) => Ok(resp),
        ::nom::IResult::Incomplete(_) => bail!(ErrorKind::BadMsg("truncated Produce response".to_owned())),
        ::nom::IResult::Error(_) => bail!(ErrorKind::BadMsg("Produce response did not have exactly one topic and one partition".to_owned())),
    }
}

/// Enforces the single-topic/single-partition arity this engine's Produce
/// path relies on. Callers that need fan-out issue one request per
/// partition rather than relying on the wire format's general array shape.
pub fn handle_produce(req: &ProduceRequest) -> Result<()> {
    require(!req.topic.is_empty(), "Produce request must name exactly one topic")?;
    require(req.partition >= 0, "Produce request must name exactly one partition")
}

#[cfg(test)]
mod tests {
    use bytes::{Bytes, BytesMut};

    use protocol::ApiKeys;
    use super::*;

    fn header() -> RequestHeader<'static> {
        RequestHeader {
            api_key: ApiKeys::Produce,
            api_version: 2,
            correlation_id: 1,
            client_id: Some("client"),
        }
    }

    #[test]
    fn acks_zero_means_no_response_expected() {
        let req = ProduceRequest {
            acks: 0,
            timeout_ms: 1000,
            topic: "t".to_owned(),
            partition: 0,
            message_set: Bytes::from_static(b"payload"),
        };
        assert!(!req.expects_response());
    }

    #[test]
    fn deadline_matches_the_timeout_when_not_yet_expired() {
        let req = ProduceRequest {
            acks: 1,
            timeout_ms: 5000,
            topic: "t".to_owned(),
            partition: 0,
            message_set: Bytes::from_static(b""),
        };
        assert_eq!(req.deadline(), Duration::from_millis(5000));
    }

    #[test]
    fn deadline_grants_a_grace_window_when_already_expired() {
        let req = ProduceRequest {
            acks: 1,
            timeout_ms: 0,
            topic: "t".to_owned(),
            partition: 0,
            message_set: Bytes::from_static(b""),
        };
        assert_eq!(req.deadline(), Duration::from_millis(100));

        let req = ProduceRequest { timeout_ms: -50, .. req };
        assert_eq!(req.deadline(), Duration::from_millis(100));
    }

    #[test]
    fn encode_writes_single_topic_single_partition_shape() {
        let req = ProduceRequest {
            acks: 1,
            timeout_ms: 1000,
            topic: "t".to_owned(),
            partition: 3,
            message_set: Bytes::from_static(b"xyz"),
        };

        let mut buf = BytesMut::with_capacity(64);
        encode_produce(&header(), &req, &mut buf).unwrap();

        // header(8) + client_id(2+6) + acks(2) + timeout(4) = 22
        assert_eq!(&buf[22..26], &[0, 0, 0, 1]); // TopicArrayCnt == 1
    }

    #[test]
    fn v2_decode_reports_throttle_time_and_log_append_time() {
        let data: Vec<u8> = vec![
            0, 0, 0, 1,             // correlation_id
            0, 0, 0, 1,             // topic count
            0, 1, b't',             // topic name
            0, 0, 0, 1,             // partition count
                0, 0, 0, 0,         // partition 0
                0, 0,               // error_code
                0, 0, 0, 0, 0, 0, 0, 42, // base_offset
                0, 0, 0, 0, 0, 0, 0, 0,  // log_append_time
            0, 0, 0, 7,             // throttle_time_ms
        ];

        let resp = decode_produce(&data, 2).unwrap();
        assert_eq!(resp.partition.base_offset, 42);
        assert!(resp.partition.log_append_time.is_some());
        assert_eq!(resp.throttle_time_ms, Some(7));
    }

    #[test]
    fn assign_offsets_per_message_adds_index_to_base() {
        let resp = ProduceResponse {
            header: ResponseHeader { correlation_id: 1 },
            topic: "t".to_owned(),
            partition: ProducePartitionResponse { partition: 0, error_code: KafkaCode::None, base_offset: 100, log_append_time: None },
            throttle_time_ms: None,
        };

        assert_eq!(resp.assign_offsets(3, OffsetReport::PerMessage), vec![100, 101, 102]);
        assert_eq!(resp.assign_offsets(3, OffsetReport::TailOffset), vec![102]);
        assert!(resp.assign_offsets(3, OffsetReport::None).is_empty());
    }

    #[test]
    fn tail_offset_matches_scenario_four() {
        let resp = ProduceResponse {
            header: ResponseHeader { correlation_id: 1 },
            topic: "t".to_owned(),
            partition: ProducePartitionResponse { partition: 0, error_code: KafkaCode::None, base_offset: 100, log_append_time: Some(9) },
            throttle_time_ms: Some(250),
        };

        assert_eq!(resp.assign_offsets(4, OffsetReport::TailOffset), vec![103]);
    }
}
