//! Metadata (ApiKey 3).
//!
//! Body: `i32 topic_count`, then `topic_count` topic-name strings.
//! `topic_count = -1` (`v >= 1`) means "all topics"; `topic_count = 0` on
//! `v >= 1` means "brokers only". On `v = 0` an empty array also means
//! "all topics" — there is no "brokers only" shape at `v = 0`.

use bytes::{BigEndian, BufMut, BytesMut};

use errors::Result;
use protocol::{parse_response_header, RequestHeader, ResponseHeader};
use wire::{parse_array_count, parse_string, WriteExt};
use errors::KafkaCode;

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRequest {
    /// `None` requests every topic in the cluster; `Some(vec![])` requests
    /// brokers only (meaningful on `v >= 1`); `Some(topics)` requests just
    /// those topics.
    pub topics: Option<Vec<String>>,
}

impl MetadataRequest {
    /// A request is a "full" (all-topics or all-brokers) request iff it
    /// covers everything the broker knows about — the shape the
    /// full-request suppressor (`suppress`) cares about.
    pub fn is_full_request(&self) -> bool {
        match self.topics {
            None => true,
            Some(ref topics) => topics.is_empty(),
        }
    }
}

pub fn encode_metadata(header: &RequestHeader, req: &MetadataRequest, api_version: i16, dst: &mut BytesMut) -> Result<()> {
    header.encode(dst)?;

    match req.topics {
        None if api_version >= 1 => {
            dst.put_i32::<BigEndian>(-1);
        }
        None => {
            // v = 0 has no null-array sentinel; an empty array already means "all topics".
            dst.put_i32::<BigEndian>(0);
        }
        Some(ref topics) => {
            dst.put_i32::<BigEndian>(topics.len() as i32);
            for topic in topics {
                dst.put_str::<BigEndian, _>(Some(topic))?;
            }
        }
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrokerMetadata {
    pub node_id: i32,
    pub host: String,
    pub port: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartitionMetadata {
    pub error_code: KafkaCode,
    pub partition: i32,
    pub leader: i32,
    pub replicas: Vec<i32>,
    pub isr: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopicMetadata {
    pub error_code: KafkaCode,
    pub topic: String,
    pub partitions: Vec<PartitionMetadata>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataResponse {
    pub header: ResponseHeader,
    pub brokers: Vec<BrokerMetadata>,
    pub topics: Vec<TopicMetadata>,
}

named!(parse_broker<BrokerMetadata>,
    do_parse!(
        node_id: ::nom::be_i32
     >> host: parse_string
     >> port: ::nom::be_i32
     >> (BrokerMetadata { node_id: node_id, host: host, port: port })
    )
);

named!(parse_partition_metadata<PartitionMetadata>,
    do_parse!(
        error_code: ::nom::be_i16
     >> partition: ::nom::be_i32
     >> leader: ::nom::be_i32
     >> replicas: length_count!(parse_array_count, ::nom::be_i32)
     >> isr: length_count!(parse_array_count, ::nom::be_i32)
     >> (PartitionMetadata {
            error_code: KafkaCode::from_wire(error_code),
            partition: partition,
            leader: leader,
            replicas: replicas,
            isr: isr,
        })
    )
);

named!(parse_topic_metadata<TopicMetadata>,
    do_parse!(
        error_code: ::nom::be_i16
     >> topic: parse_string
     >> partitions: length_count!(parse_array_count, parse_partition_metadata)
     >> (TopicMetadata {
            error_code: KafkaCode::from_wire(error_code),
            topic: topic,
            partitions: partitions,
        })
    )
);

named!(pub decode_metadata<MetadataResponse>,
    do_parse!(
        header: parse_response_header
     >> brokers: length_count!(parse_array_count, parse_broker)
     >> topics: length_count!(parse_array_count, parse_topic_metadata)
     >> (MetadataResponse { header: header, brokers: brokers, topics: topics })
    )
);
