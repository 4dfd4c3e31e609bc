//! ListOffsets (ApiKey 2, historically "Offsets").
//!
//! Topics are encoded in ascending name order regardless of the order the
//! caller built the request in, so that repeated calls with the same
//! logical request produce byte-identical wire output.
//!
//! `v = 0` additionally carries a `max_num_offsets` field per partition and
//! returns an *array* of offsets (we keep only the first, matching the
//! single-offset behavior every caller of this engine actually wants). `v =
//! 1` drops `max_num_offsets`, replaces the offsets array with a single
//! `(timestamp, offset)` pair, and is the version gated behind the
//! `OFFSET_TIME` feature bit whenever the request uses a timestamp other
//! than the `-1`/`-2` sentinels (latest/earliest).

use bytes::{BigEndian, BufMut, BytesMut};

use errors::{ErrorKind, KafkaCode, Result};
use protocol::{parse_response_header, RequestHeader, ResponseHeader};
use wire::{parse_array_count, parse_string, WriteExt};

pub const LATEST: i64 = -1;
pub const EARLIEST: i64 = -2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetPartitionRequest {
    pub partition: i32,
    pub time: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OffsetRequest {
    pub topics: Vec<(String, Vec<OffsetPartitionRequest>)>,
}

/// Encodes a ListOffsets request. `supports_offset_time` reflects whether
/// the negotiated broker feature set includes `OFFSET_TIME` (`version::FeatureFlags`);
/// requesting a non-sentinel timestamp without it is a caller error.
pub fn encode_offset(header: &RequestHeader, req: &OffsetRequest, api_version: i16, supports_offset_time: bool, dst: &mut BytesMut) -> Result<()> {
    if !supports_offset_time {
        for &(_, ref partitions) in &req.topics {
            for p in partitions {
                if p.time != LATEST && p.time != EARLIEST {
                    bail!(ErrorKind::InvalidArg(format!("broker does not support arbitrary offset timestamps (partition {})", p.partition)));
                }
            }
        }
    }

    header.encode(dst)?;
    dst.put_i32::<BigEndian>(-1); // ReplicaId: always -1 from a client

    let mut topics = req.topics.clone();
    topics.sort_by(|a, b| a.0.cmp(&b.0));

    dst.put_i32::<BigEndian>(topics.len() as i32);
    for &(ref topic, ref partitions) in &topics {
        dst.put_str::<BigEndian, _>(Some(topic))?;
        dst.put_i32::<BigEndian>(partitions.len() as i32);
        for p in partitions {
            dst.put_i32::<BigEndian>(p.partition);
            dst.put_i64::<BigEndian>(p.time);
            if api_version == 0 {
                dst.put_i32::<BigEndian>(1); // max_num_offsets
            }
        }
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct OffsetPartitionResponse {
    pub partition: i32,
    pub error_code: KafkaCode,
    pub timestamp: Option<i64>,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OffsetResponse {
    pub header: ResponseHeader,
    pub topics: Vec<(String, Vec<OffsetPartitionResponse>)>,
}

named_args!(parse_partition_response_v0(api_version: i16)<OffsetPartitionResponse>,
    do_parse!(
        partition: ::nom::be_i32
     >> error_code: ::nom::be_i16
     >> offsets: length_count!(parse_array_count, ::nom::be_i64)
     >> (OffsetPartitionResponse {
            partition: partition,
            error_code: KafkaCode::from_wire(error_code),
            timestamp: None,
            offset: offsets.into_iter().next().unwrap_or(-1),
        })
    )
);

named!(parse_partition_response_v1<OffsetPartitionResponse>,
    do_parse!(
        partition: ::nom::be_i32
     >> error_code: ::nom::be_i16
     >> timestamp: ::nom::be_i64
     >> offset: ::nom::be_i64
     >> (OffsetPartitionResponse {
            partition: partition,
            error_code: KafkaCode::from_wire(error_code),
            timestamp: Some(timestamp),
            offset: offset,
        })
    )
);

named_args!(parse_topic_response(api_version: i16)<(String, Vec<OffsetPartitionResponse>)>,
    do_parse!(
        topic: parse_string
     >> partitions: cond_reduce!(api_version == 0,
            length_count!(parse_array_count, call!(parse_partition_response_v0, api_version))) >>
        partitions_v1: cond_reduce!(api_version >= 1,
            length_count!(parse_array_count, parse_partition_response_v1)) >>
        (topic, if api_version == 0 { partitions } else { partitions_v1 })
    )
);

pub fn decode_offset(input: &[u8], api_version: i16) -> Result<OffsetResponse> {
    let parsed = do_parse!(input,
        header: parse_response_header
     >> topics: length_count!(parse_array_count, call!(parse_topic_response, api_version))
     >> (OffsetResponse { header: header, topics: topics })
    );

    match parsed {
        ::nom::IResult::Done(_, resp) => Ok(resp),
        ::nom::IResult::Incomplete(_) => bail!(ErrorKind::BadMsg("truncated ListOffsets response".to_owned())),
        ::nom::IResult::Error(e) => bail!(e),
    }
}

/// Re-associates decoded partition responses back onto the partitions the
/// caller originally asked for, by partition id rather than by the order
/// the broker happened to return them in — brokers are not required to
/// preserve request order within a topic's partition array.
pub fn reassociate<'a>(requested: &[OffsetPartitionRequest], decoded: &'a [OffsetPartitionResponse]) -> Vec<(OffsetPartitionRequest, Option<&'a OffsetPartitionResponse>)> {
    requested.iter()
        .map(|req| {
            let found = decoded.iter().find(|d| d.partition == req.partition);
            (*req, found)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use protocol::ApiKeys;
    use super::*;

    fn header(version: i16) -> RequestHeader<'static> {
        RequestHeader {
            api_key: ApiKeys::Offsets,
            api_version: version,
            correlation_id: 1,
            client_id: Some("client"),
        }
    }

    #[test]
    fn v1_encodes_topics_sorted_and_omits_max_num_offsets() {
        let req = OffsetRequest {
            topics: vec![
                ("zeta".to_owned(), vec![OffsetPartitionRequest { partition: 0, time: LATEST }]),
                ("alpha".to_owned(), vec![OffsetPartitionRequest { partition: 0, time: EARLIEST }]),
            ],
        };

        let mut buf = BytesMut::with_capacity(128);
        encode_offset(&header(1), &req, 1, true, &mut buf).unwrap();

        // skip header (2+2+4) + nullable client_id (2+6) + replica_id (4) = 20
        let body = &buf[20..];
        // topic array count = 2
        assert_eq!(&body[0..4], &[0, 0, 0, 2]);
        // first topic name must be "alpha" (sorted ahead of "zeta")
        assert_eq!(&body[4..6], &[0, 5]);
        assert_eq!(&body[6..11], b"alpha");
    }

    #[test]
    fn v0_rejects_arbitrary_timestamp_without_offset_time_feature() {
        let req = OffsetRequest {
            topics: vec![("t".to_owned(), vec![OffsetPartitionRequest { partition: 0, time: 1_600_000_000_000 }])],
        };

        let mut buf = BytesMut::with_capacity(64);
        assert!(encode_offset(&header(0), &req, 0, false, &mut buf).is_err());
    }

    #[test]
    fn v0_includes_max_num_offsets_field() {
        let req = OffsetRequest {
            topics: vec![("t".to_owned(), vec![OffsetPartitionRequest { partition: 3, time: LATEST }])],
        };

        let mut buf = BytesMut::with_capacity(64);
        encode_offset(&header(0), &req, 0, true, &mut buf).unwrap();

        assert_eq!(&buf[buf.len() - 4..], &[0, 0, 0, 1]);
    }

    #[test]
    fn reassociate_matches_by_partition_id_not_position() {
        let requested = vec![
            OffsetPartitionRequest { partition: 0, time: LATEST },
            OffsetPartitionRequest { partition: 1, time: LATEST },
        ];
        // broker returns partition 1 before partition 0
        let decoded = vec![
            OffsetPartitionResponse { partition: 1, error_code: KafkaCode::None, timestamp: None, offset: 99 },
            OffsetPartitionResponse { partition: 0, error_code: KafkaCode::None, timestamp: None, offset: 42 },
        ];

        let paired = reassociate(&requested, &decoded);
        assert_eq!(paired[0].1.unwrap().offset, 42);
        assert_eq!(paired[1].1.unwrap().offset, 99);
    }
}
