//! OffsetFetch (ApiKey 9).
//!
//! Fetches committed offsets for a consumer group, grouped by topic. A
//! partition whose locally cached offset is anything other than
//! `INVALID`/`STORED` is skipped before the request is even built — it
//! already has a value worth trusting, so there is nothing to ask the
//! broker for. If every partition the caller passed in gets filtered out
//! this way, the handler short-circuits with a synthetic empty reply
//! instead of making a round trip.

use bytes::{BigEndian, BufMut, BytesMut};

use errors::{KafkaCode, Result};
use protocol::{parse_response_header, RequestHeader, ResponseHeader};
use wire::{parse_array_count, parse_string, parse_string_opt, WriteExt};

/// Sentinel meaning "no committed offset known yet" — the only two values a
/// partition may carry for this request to be worth sending for it.
pub const INVALID: i64 = -1;
pub const STORED: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetFetchPartitionRequest {
    pub partition: i32,
    pub cached_offset: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OffsetFetchRequest {
    pub group_id: String,
    pub topics: Vec<(String, Vec<OffsetFetchPartitionRequest>)>,
}

impl OffsetFetchRequest {
    /// Drops partitions whose cached offset is already meaningful, and the
    /// topics that end up with no partitions left. Returns the filtered
    /// request; an empty `topics` list means the handler should skip the
    /// round trip entirely.
    pub fn filtered(&self) -> OffsetFetchRequest {
        let topics = self.topics.iter()
            .filter_map(|&(ref topic, ref partitions)| {
                let kept: Vec<_> = partitions.iter()
                    .cloned()
                    .filter(|p| p.cached_offset == INVALID)
                    .collect();
                if kept.is_empty() { None } else { Some((topic.clone(), kept)) }
            })
            .collect();

        OffsetFetchRequest { group_id: self.group_id.clone(), topics: topics }
    }

    pub fn is_empty_after_filter(&self) -> bool {
        self.filtered().topics.is_empty()
    }
}

pub fn encode_offset_fetch(header: &RequestHeader, req: &OffsetFetchRequest, dst: &mut BytesMut) -> Result<()> {
    header.encode(dst)?;
    dst.put_str::<BigEndian, _>(Some(&req.group_id))?;

    dst.put_i32::<BigEndian>(req.topics.len() as i32);
    for &(ref topic, ref partitions) in &req.topics {
        dst.put_str::<BigEndian, _>(Some(topic))?;
        dst.put_i32::<BigEndian>(partitions.len() as i32);
        for p in partitions {
            dst.put_i32::<BigEndian>(p.partition);
        }
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct OffsetFetchPartitionResponse {
    pub partition: i32,
    pub offset: i64,
    pub metadata: Option<String>,
    pub error_code: KafkaCode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OffsetFetchResponse {
    pub header: ResponseHeader,
    pub topics: Vec<(String, Vec<OffsetFetchPartitionResponse>)>,
}

impl OffsetFetchResponse {
    pub fn empty(correlation_id: i32) -> OffsetFetchResponse {
        OffsetFetchResponse {
            header: ResponseHeader { correlation_id: correlation_id },
            topics: Vec::new(),
        }
    }
}

named!(parse_partition_response<OffsetFetchPartitionResponse>,
    do_parse!(
        partition: ::nom::be_i32
     >> offset: ::nom::be_i64
     >> metadata: parse_string_opt
     >> error_code: ::nom::be_i16
     >> (OffsetFetchPartitionResponse {
            partition: partition,
            // the broker encodes "no committed offset" as -1; normalize it
            // to the same INVALID sentinel the request side uses.
            offset: if offset < 0 { INVALID } else { offset },
            metadata: metadata,
            error_code: KafkaCode::from_wire(error_code),
        })
    )
);

named!(parse_topic_response<(String, Vec<OffsetFetchPartitionResponse>)>,
    do_parse!(
        topic: parse_string
     >> partitions: length_count!(parse_array_count, parse_partition_response)
     >> (topic, partitions)
    )
);

named!(pub decode_offset_fetch<OffsetFetchResponse>,
    do_parse!(
        header: parse_response_header
     >> topics: length_count!(parse_array_count, parse_topic_response)
     >> (OffsetFetchResponse { header: header, topics: topics })
    )
);

/// Drops any decoded partition the caller never asked about, matching
/// partitions by id within each topic (the broker is not required to
/// preserve request order — see `offset::reassociate`). A partition whose
/// per-partition `error_code` is set is also dropped: the committed-offset
/// field only gets updated when the broker actually returned one.
pub fn update_toppar(requested: &OffsetFetchRequest, resp: &OffsetFetchResponse) -> Vec<(String, OffsetFetchPartitionResponse)> {
    let mut out = Vec::new();
    for &(ref topic, ref wanted) in &requested.topics {
        if let Some(&(_, ref got)) = resp.topics.iter().find(|&&(ref t, _)| t == topic) {
            for partition in wanted {
                if let Some(found) = got.iter().find(|g| g.partition == partition.partition && g.error_code.is_success()) {
                    out.push((topic.clone(), found.clone()));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use protocol::ApiKeys;
    use super::*;

    fn header() -> RequestHeader<'static> {
        RequestHeader {
            api_key: ApiKeys::OffsetFetch,
            api_version: 1,
            correlation_id: 5,
            client_id: Some("client"),
        }
    }

    #[test]
    fn filter_drops_partitions_with_a_known_offset() {
        let req = OffsetFetchRequest {
            group_id: "g".to_owned(),
            topics: vec![
                ("t".to_owned(), vec![
                    OffsetFetchPartitionRequest { partition: 0, cached_offset: INVALID },
                    OffsetFetchPartitionRequest { partition: 1, cached_offset: 42 },
                ]),
            ],
        };

        let filtered = req.filtered();
        assert_eq!(filtered.topics.len(), 1);
        assert_eq!(filtered.topics[0].1.len(), 1);
        assert_eq!(filtered.topics[0].1[0].partition, 0);
    }

    #[test]
    fn all_partitions_known_short_circuits_the_round_trip() {
        let req = OffsetFetchRequest {
            group_id: "g".to_owned(),
            topics: vec![
                ("t".to_owned(), vec![OffsetFetchPartitionRequest { partition: 0, cached_offset: 7 }]),
            ],
        };

        assert!(req.is_empty_after_filter());
    }

    #[test]
    fn encode_writes_group_id_and_nested_arrays() {
        use bytes::BytesMut;

        let req = OffsetFetchRequest {
            group_id: "mygroup".to_owned(),
            topics: vec![("t".to_owned(), vec![OffsetFetchPartitionRequest { partition: 2, cached_offset: INVALID }])],
        };

        let mut buf = BytesMut::with_capacity(64);
        encode_offset_fetch(&header(), &req, &mut buf).unwrap();

        // header (2+2+4) + client_id (2+6) + group_id (2+7) = 23
        assert_eq!(&buf[12..14], &[0, 7]);
        assert_eq!(&buf[14..21], b"mygroup");
    }

    #[test]
    fn update_toppar_drops_unmatched_results() {
        let requested = OffsetFetchRequest {
            group_id: "g".to_owned(),
            topics: vec![("t".to_owned(), vec![OffsetFetchPartitionRequest { partition: 0, cached_offset: INVALID }])],
        };

        let resp = OffsetFetchResponse {
            header: ResponseHeader { correlation_id: 1 },
            topics: vec![
                ("t".to_owned(), vec![
                    OffsetFetchPartitionResponse { partition: 0, offset: 10, metadata: None, error_code: KafkaCode::None },
                    OffsetFetchPartitionResponse { partition: 1, offset: 20, metadata: None, error_code: KafkaCode::None },
                ]),
                ("other".to_owned(), vec![OffsetFetchPartitionResponse { partition: 0, offset: 99, metadata: None, error_code: KafkaCode::None }]),
            ],
        };

        let matched = update_toppar(&requested, &resp);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].1.offset, 10);
    }

    #[test]
    fn update_toppar_drops_partitions_with_an_error_code() {
        let requested = OffsetFetchRequest {
            group_id: "g".to_owned(),
            topics: vec![("t".to_owned(), vec![OffsetFetchPartitionRequest { partition: 0, cached_offset: INVALID }])],
        };

        let resp = OffsetFetchResponse {
            header: ResponseHeader { correlation_id: 1 },
            topics: vec![
                ("t".to_owned(), vec![
                    OffsetFetchPartitionResponse { partition: 0, offset: 10, metadata: None, error_code: KafkaCode::NotCoordinatorForGroup },
                ]),
            ],
        };

        let matched = update_toppar(&requested, &resp);
        assert!(matched.is_empty());
    }
}
