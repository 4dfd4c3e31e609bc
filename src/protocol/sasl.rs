//! SaslHandshake (ApiKey 17).
//!
//! Carries a single mechanism name. Never retried, like ApiVersions — it
//! runs once during connection setup. When dynamic version negotiation is
//! disabled (no ApiVersions round trip happened) and the configured socket
//! timeout exceeds 10 seconds, the deadline is clamped down to 10 seconds
//! rather than inheriting the full socket timeout: a broker that can't
//! complete a handshake in 10 seconds is not one worth waiting the full
//! socket timeout on.

use std::time::Duration;

use bytes::{BigEndian, BytesMut};

use errors::{KafkaCode, Result};
use protocol::{parse_response_header, RequestHeader, ResponseHeader};
use wire::{parse_string, WriteExt};

const HANDSHAKE_DEADLINE_CAP: Duration = Duration::from_secs(10);

pub fn encode_sasl_handshake(header: &RequestHeader, mechanism: &str, dst: &mut BytesMut) -> Result<()> {
    header.encode(dst)?;
    dst.put_str::<BigEndian, _>(Some(mechanism))
}

/// The deadline to use for a SaslHandshake call: `socket_timeout` unless
/// dynamic versioning is disabled and it exceeds the 10s cap.
pub fn handshake_deadline(socket_timeout: Duration, dynamic_versioning: bool) -> Duration {
    if !dynamic_versioning && socket_timeout > HANDSHAKE_DEADLINE_CAP {
        HANDSHAKE_DEADLINE_CAP
    } else {
        socket_timeout
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaslHandshakeResponse {
    pub header: ResponseHeader,
    pub error_code: KafkaCode,
    pub enabled_mechanisms: Vec<String>,
}

named!(pub decode_sasl_handshake<SaslHandshakeResponse>,
    do_parse!(
        header: parse_response_header
     >> error_code: ::nom::be_i16
     >> enabled_mechanisms: length_count!(::nom::be_i32, parse_string)
     >> (SaslHandshakeResponse {
            header: header,
            error_code: KafkaCode::from_wire(error_code),
            enabled_mechanisms: enabled_mechanisms,
        })
    )
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_is_clamped_only_without_dynamic_versioning() {
        let long = Duration::from_secs(30);
        assert_eq!(handshake_deadline(long, false), HANDSHAKE_DEADLINE_CAP);
        assert_eq!(handshake_deadline(long, true), long);
    }

    #[test]
    fn deadline_is_unaffected_when_already_under_the_cap() {
        let short = Duration::from_secs(5);
        assert_eq!(handshake_deadline(short, false), short);
    }

    #[test]
    fn encode_writes_header_then_mechanism_string() {
        use bytes::BytesMut;
        use protocol::ApiKeys;

        let header = RequestHeader {
            api_key: ApiKeys::SaslHandshake,
            api_version: 0,
            correlation_id: 1,
            client_id: None,
        };
        let mut buf = BytesMut::with_capacity(32);
        encode_sasl_handshake(&header, "PLAIN", &mut buf).unwrap();

        assert_eq!(&buf[buf.len() - 7..buf.len() - 5], &[0, 5]);
        assert_eq!(&buf[buf.len() - 5..], b"PLAIN");
    }
}
