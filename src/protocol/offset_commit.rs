//! OffsetCommit (ApiKey 8).
//!
//! `v >= 1` adds `generation_id`/`member_id` (the committer must be a known
//! member of the consumer group). `v = 2` pins `retention_time = -1`
//! (broker default) — the engine never lets a caller override it. A
//! partition whose offset is negative is dropped before encoding: there is
//! nothing meaningful to commit. Null per-partition metadata is encoded as
//! an empty string rather than a null, matching the teacher's existing
//! `parse_str`/`put_str` convention of reserving `None` for "field absent",
//! not "field empty".

use bytes::{BigEndian, BufMut, BytesMut};

use errors::{ErrorKind, KafkaCode, Result};
use protocol::{parse_response_header, RequestHeader, ResponseHeader};
use wire::{parse_array_count, parse_string, WriteExt};

const RETENTION_TIME_BROKER_DEFAULT: i64 = -1;

#[derive(Debug, Clone, PartialEq)]
pub struct OffsetCommitPartition {
    pub partition: i32,
    pub offset: i64,
    pub metadata: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OffsetCommitRequest {
    pub group_id: String,
    pub generation_id: i32,
    pub member_id: String,
    pub topics: Vec<(String, Vec<OffsetCommitPartition>)>,
}

impl OffsetCommitRequest {
    /// Drops partitions with a negative offset (nothing meaningful to
    /// commit), and the topics that end up with no partitions left.
    pub fn filtered(&self) -> OffsetCommitRequest {
        let topics = self.topics.iter()
            .filter_map(|&(ref topic, ref partitions)| {
                let kept: Vec<_> = partitions.iter()
                    .cloned()
                    .filter(|p| p.offset >= 0)
                    .collect();
                if kept.is_empty() { None } else { Some((topic.clone(), kept)) }
            })
            .collect();

        OffsetCommitRequest {
            group_id: self.group_id.clone(),
            generation_id: self.generation_id,
            member_id: self.member_id.clone(),
            topics: topics,
        }
    }

    /// `true` iff every partition offered was negative — the caller should
    /// skip the round trip entirely rather than send an empty commit.
    pub fn is_empty_after_filter(&self) -> bool {
        self.filtered().topics.is_empty()
    }
}

pub fn encode_offset_commit(header: &RequestHeader, req: &OffsetCommitRequest, api_version: i16, dst: &mut BytesMut) -> Result<()> {
    header.encode(dst)?;
    dst.put_str::<BigEndian, _>(Some(&req.group_id))?;

    if api_version >= 1 {
        dst.put_i32::<BigEndian>(req.generation_id);
        dst.put_str::<BigEndian, _>(Some(&req.member_id))?;
    }

    if api_version == 2 {
        dst.put_i64::<BigEndian>(RETENTION_TIME_BROKER_DEFAULT);
    }

    let filtered = req.filtered();

    dst.put_i32::<BigEndian>(filtered.topics.len() as i32);
    for (topic, partitions) in filtered.topics {
        dst.put_str::<BigEndian, _>(Some(&topic))?;
        dst.put_i32::<BigEndian>(partitions.len() as i32);
        for p in partitions {
            dst.put_i32::<BigEndian>(p.partition);
            dst.put_i64::<BigEndian>(p.offset);
            if api_version == 1 {
                dst.put_i64::<BigEndian>(-1); // commit timestamp, always -1
            }
            let metadata = p.metadata.as_ref().map(|s| s.as_str()).unwrap_or("");
            dst.put_str::<BigEndian, _>(Some(metadata))?;
        }
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct OffsetCommitPartitionResponse {
    pub partition: i32,
    pub error_code: KafkaCode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OffsetCommitResponse {
    pub header: ResponseHeader,
    pub topics: Vec<(String, Vec<OffsetCommitPartitionResponse>)>,
}

impl OffsetCommitResponse {
    /// The synthetic reply to hand the caller when `filtered()` leaves
    /// nothing to commit — no partitions means nothing failed.
    pub fn empty(correlation_id: i32) -> OffsetCommitResponse {
        OffsetCommitResponse {
            header: ResponseHeader { correlation_id: correlation_id },
            topics: Vec::new(),
        }
    }

    /// `Ok(())` unless *every* partition in the commit failed, in which
    /// case the last error encountered is surfaced so callers that never
    /// inspect the per-partition results still learn the batch failed. A
    /// partial failure stays `Ok(())` at this level — per-partition
    /// inspection is how a caller learns about it.
    pub fn into_result(self) -> ::std::result::Result<(), KafkaCode> {
        let mut total = 0;
        let mut failures = 0;
        let mut last_error = None;
        for &(_, ref partitions) in &self.topics {
            for p in partitions {
                total += 1;
                if !p.error_code.is_success() {
                    failures += 1;
                    last_error = Some(p.error_code);
                }
            }
        }

        if total > 0 && failures == total {
            last_error.map_or(Ok(()), Err)
        } else {
            Ok(())
        }
    }
}

named!(parse_partition_response<OffsetCommitPartitionResponse>,
    do_parse!(
        partition: ::nom::be_i32
     >> error_code: ::nom::be_i16
     >> (OffsetCommitPartitionResponse { partition: partition, error_code: KafkaCode::from_wire(error_code) })
    )
);

named!(parse_topic_response<(String, Vec<OffsetCommitPartitionResponse>)>,
    do_parse!(
        topic: parse_string
     >> partitions: length_count!(parse_array_count, parse_partition_response)
     >> (topic, partitions)
    )
);

named!(pub decode_offset_commit<OffsetCommitResponse>,
    do_parse!(
        header: parse_response_header
     >> topics: length_count!(parse_array_count, parse_topic_response)
     >> (OffsetCommitResponse { header: header, topics: topics })
    )
);
