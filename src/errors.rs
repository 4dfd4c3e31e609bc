//! Crate-wide error types.
//!
//! Every numeric code a broker can return, plus a handful of client-local
//! pseudo codes the engine needs to feed through the same classifier (see
//! `classify`), live on `KafkaCode`. Local codes are assigned values below
//! the Kafka protocol's own `-1` ("Unknown") sentinel so the two families
//! never collide.

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum KafkaCode {
    /// The server experienced an unexpected error when processing the request.
    Unknown = -1,
    None = 0,
    OffsetOutOfRange = 1,
    CorruptMessage = 2,
    UnknownTopicOrPartition = 3,
    InvalidMessageSize = 4,
    LeaderNotAvailable = 5,
    NotLeaderForPartition = 6,
    RequestTimedOut = 7,
    BrokerNotAvailable = 8,
    ReplicaNotAvailable = 9,
    MessageSizeTooLarge = 10,
    StaleControllerEpoch = 11,
    OffsetMetadataTooLarge = 12,
    NetworkException = 13,
    GroupLoadInProgress = 14,
    GroupCoordinatorNotAvailable = 15,
    NotCoordinatorForGroup = 16,
    InvalidTopic = 17,
    RecordListTooLarge = 18,
    NotEnoughReplicas = 19,
    NotEnoughReplicasAfterAppend = 20,
    InvalidRequiredAcks = 21,
    IllegalGeneration = 22,
    InconsistentGroupProtocol = 23,
    InvalidGroupId = 24,
    UnknownMemberId = 25,
    InvalidSessionTimeout = 26,
    RebalanceInProgress = 27,
    InvalidCommitOffsetSize = 28,
    TopicAuthorizationFailed = 29,
    GroupAuthorizationFailed = 30,
    ClusterAuthorizationFailed = 31,
    InvalidTimestamp = 32,
    UnsupportedSaslMechanism = 33,
    IllegalSaslState = 34,
    UnsupportedVersion = 35,
    TopicAlreadyExists = 36,
    InvalidPartitions = 37,
    InvalidReplicationFactor = 38,
    InvalidReplicaAssignment = 39,
    InvalidConfig = 40,
    NotController = 41,
    InvalidRequest = 42,
    UnsupportedForMessageFormat = 43,
    PolicyViolation = 44,

    // --- client-local pseudo codes, never sent on the wire ---
    /// Deadline passed while the request was still queued (not yet sent).
    TimedOut = -150,
    /// Deadline passed after the request was sent but before a reply arrived.
    TimedOutQueue = -151,
    /// The connection carrying the request was lost.
    Transport = -152,
    /// The client is shutting down; release resources without surfacing an error.
    Destroy = -153,
    /// Coordinator lookup is in progress; treat like a transient coordinator error.
    WaitCoord = -154,
}

impl KafkaCode {
    /// Safe decode of a wire-supplied error code. Unknown/unmapped values
    /// collapse to `Unknown` rather than risking undefined behavior from a
    /// raw transmute.
    pub fn from_wire(v: i16) -> KafkaCode {
        match v {
            -1 => KafkaCode::Unknown,
            0 => KafkaCode::None,
            1 => KafkaCode::OffsetOutOfRange,
            2 => KafkaCode::CorruptMessage,
            3 => KafkaCode::UnknownTopicOrPartition,
            4 => KafkaCode::InvalidMessageSize,
            5 => KafkaCode::LeaderNotAvailable,
            6 => KafkaCode::NotLeaderForPartition,
            7 => KafkaCode::RequestTimedOut,
            8 => KafkaCode::BrokerNotAvailable,
            9 => KafkaCode::ReplicaNotAvailable,
            10 => KafkaCode::MessageSizeTooLarge,
            11 => KafkaCode::StaleControllerEpoch,
            12 => KafkaCode::OffsetMetadataTooLarge,
            13 => KafkaCode::NetworkException,
            14 => KafkaCode::GroupLoadInProgress,
            15 => KafkaCode::GroupCoordinatorNotAvailable,
            16 => KafkaCode::NotCoordinatorForGroup,
            17 => KafkaCode::InvalidTopic,
            18 => KafkaCode::RecordListTooLarge,
            19 => KafkaCode::NotEnoughReplicas,
            20 => KafkaCode::NotEnoughReplicasAfterAppend,
            21 => KafkaCode::InvalidRequiredAcks,
            22 => KafkaCode::IllegalGeneration,
            23 => KafkaCode::InconsistentGroupProtocol,
            24 => KafkaCode::InvalidGroupId,
            25 => KafkaCode::UnknownMemberId,
            26 => KafkaCode::InvalidSessionTimeout,
            27 => KafkaCode::RebalanceInProgress,
            28 => KafkaCode::InvalidCommitOffsetSize,
            29 => KafkaCode::TopicAuthorizationFailed,
            30 => KafkaCode::GroupAuthorizationFailed,
            31 => KafkaCode::ClusterAuthorizationFailed,
            32 => KafkaCode::InvalidTimestamp,
            33 => KafkaCode::UnsupportedSaslMechanism,
            34 => KafkaCode::IllegalSaslState,
            35 => KafkaCode::UnsupportedVersion,
            36 => KafkaCode::TopicAlreadyExists,
            37 => KafkaCode::InvalidPartitions,
            38 => KafkaCode::InvalidReplicationFactor,
            39 => KafkaCode::InvalidReplicaAssignment,
            40 => KafkaCode::InvalidConfig,
            41 => KafkaCode::NotController,
            42 => KafkaCode::InvalidRequest,
            43 => KafkaCode::UnsupportedForMessageFormat,
            44 => KafkaCode::PolicyViolation,
            _ => KafkaCode::Unknown,
        }
    }

    pub fn is_success(&self) -> bool {
        *self == KafkaCode::None
    }
}

impl From<i16> for KafkaCode {
    fn from(v: i16) -> Self {
        KafkaCode::from_wire(v)
    }
}

error_chain! {
    foreign_links {
        Io(::std::io::Error);
        Parse(::nom::ErrorKind);
    }

    errors {
        /// The wire reader ran out of bytes, or a layout precondition (sort
        /// order, array-count bound, topic/partition arity) was violated
        /// while decoding a response.
        BadMsg(reason: String) {
            description("malformed Kafka response")
            display("malformed Kafka response: {}", reason)
        }
        /// No version in the caller's `[min, max]` range is advertised by
        /// the broker for this API key.
        UnsupportedFeature(api_key: i16, min: i16, max: i16) {
            description("unsupported API version")
            display("broker does not support api key {} in range [{}, {}]", api_key, min, max)
        }
        /// A coordinator or leader reference could not be resolved.
        BrokerNotFound(reason: String) {
            description("broker not found")
            display("broker not found: {}", reason)
        }
        /// The caller's reply route was canceled before a reply arrived.
        Canceled(reason: String) {
            description("request canceled")
            display("request canceled: {}", reason)
        }
        /// A handler received a response tagged with a different API key
        /// than the one it was registered for.
        UnexpectedResponse(api_key: i16) {
            description("unexpected response")
            display("unexpected response for api key {}", api_key)
        }
        /// A second unforced full-cluster request was suppressed because one
        /// of the same kind was already in flight.
        PrevInProgress {
            description("a full-cluster request of this kind is already in flight")
        }
        /// A caller-supplied argument failed a precondition check.
        InvalidArg(reason: String) {
            description("invalid argument")
            display("invalid argument: {}", reason)
        }
        /// The broker returned an error code for the request.
        KafkaError(code: KafkaCode) {
            description("broker returned an error")
            display("broker returned error: {:?}", code)
        }
    }
}
