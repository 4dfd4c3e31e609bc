//! ApiVersions (ApiKey 18).
//!
//! Request body is always `array_count = 0` (ask for every API the broker
//! knows about); there is nothing else to encode. Never retried —
//! negotiation happens once, ahead of everything else, and a failure here
//! means the broker is unreachable in a way retrying won't fix.
//!
//! The decoded table is rejected outright if the broker claims more than
//! 1000 entries — no real broker has anywhere near that many APIs, so a
//! count that large means the response is corrupt — and is sorted by
//! `api_key` ascending before being handed to `version::ApiVersionTable`,
//! which binary searches it.

use bytes::{BigEndian, BufMut, BytesMut};

use errors::{ErrorKind, KafkaCode, Result};
use protocol::{parse_response_header, RequestHeader, ResponseHeader};
use version::{ApiVersionTable, BrokerApiVersion};

const MAX_API_ARRAY_COUNT: i32 = 1000;

pub fn encode_api_versions(header: &RequestHeader, dst: &mut BytesMut) -> Result<()> {
    header.encode(dst)
}

#[derive(Clone, Debug, PartialEq)]
pub struct SupportedApiVersion {
    pub api_key: i16,
    pub min_version: i16,
    pub max_version: i16,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ApiVersionsResponse {
    pub header: ResponseHeader,
    pub error_code: KafkaCode,
    pub api_versions: Vec<SupportedApiVersion>,
}

impl ApiVersionsResponse {
    pub fn into_table(self) -> ApiVersionTable {
        ApiVersionTable::new(self.api_versions.into_iter()
            .map(|v| BrokerApiVersion { api_key: v.api_key, min_version: v.min_version, max_version: v.max_version })
            .collect())
    }
}

named!(parse_supported_api_version<SupportedApiVersion>,
    do_parse!(
        api_key: ::nom::be_i16
     >> min_version: ::nom::be_i16
     >> max_version: ::nom::be_i16
     >> (SupportedApiVersion { api_key: api_key, min_version: min_version, max_version: max_version })
    )
);

pub fn decode_api_versions(input: &[u8]) -> Result<ApiVersionsResponse> {
    let parsed = do_parse!(input,
        header: parse_response_header
     >> error_code: ::nom::be_i16
     >> count: verify!(::nom::be_i32, |c: i32| c >= 0 && c <= MAX_API_ARRAY_COUNT)
     >> api_versions: count!(parse_supported_api_version, count as usize)
     >> (ApiVersionsResponse {
            header: header,
            error_code: KafkaCode::from_wire(error_code),
            api_versions: api_versions,
        })
    );

    match parsed {
        ::nom::IResult::Done(_, mut resp) => {
            resp.api_versions.sort_by_key(|v| v.api_key);
            Ok(resp)
        }
        ::nom::IResult::Incomplete(_) => bail!(ErrorKind::BadMsg("truncated ApiVersions response".to_owned())),
        ::nom::IResult::Error(_) => bail!(ErrorKind::BadMsg("ApiVersions array count exceeds the sanity bound".to_owned())),
    }
}
