//! C7 — the error-action classifier.
//!
//! `classify` is a pure function: given a broker (or client-local) error
//! code, an optional list of per-call overrides, and whether the failing
//! request still has a live envelope to retry against, it produces an
//! `Action` bitmask describing what the caller should do next. It does not
//! retry anything itself — `driver` turns the bitmask into actual behavior.
//!
//! Classification happens in two stages. `overrides` is checked first, in
//! order; the first matching entry wins outright and the default table
//! below is never consulted for that code. This lets a single call site
//! (e.g. OffsetCommit, where a stale generation should be terminal even
//! though the same code is usually transient elsewhere) carry a
//! locally-correct action without forking the default table. When nothing
//! in `overrides` matches, the default table applies.
//!
//! `Action::RETRY` is always cleared from the result when `has_envelope` is
//! false: there is nothing left to resend once the envelope that carried
//! the request is gone, no matter what the table says.

use errors::KafkaCode;

/// A bitmask of actions the driver (C8) should take in response to an
/// error. Hand-rolled rather than pulled in from a crate: the example
/// corpus has no precedent for a bitflags dependency, and the set of bits
/// is small and fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action(u8);

impl Action {
    pub const NONE: Action = Action(0);
    /// The error is terminal; no retry will help.
    pub const PERMANENT: Action = Action(1 << 0);
    /// Drop the error silently (e.g. the client is shutting down).
    pub const IGNORE: Action = Action(1 << 1);
    /// Metadata for the topic/partition or group coordinator is stale;
    /// refresh it before retrying.
    pub const REFRESH: Action = Action(1 << 2);
    /// Resend the request, subject to the caller's retry budget.
    pub const RETRY: Action = Action(1 << 3);
    /// Surface the error to the application-level caller.
    pub const INFORM: Action = Action(1 << 4);
    /// Requires handling specific to this error (e.g. coordinator lookup).
    pub const SPECIAL: Action = Action(1 << 5);

    pub fn contains(&self, other: Action) -> bool {
        self.0 & other.0 == other.0
    }

    fn remove(self, other: Action) -> Action {
        Action(self.0 & !other.0)
    }
}

impl ::std::ops::BitOr for Action {
    type Output = Action;
    fn bitor(self, rhs: Action) -> Action {
        Action(self.0 | rhs.0)
    }
}

/// One override entry: `code` matches exactly, and when it does `action`
/// replaces whatever the default table would have produced.
#[derive(Debug, Clone, Copy)]
pub struct Override {
    pub code: KafkaCode,
    pub action: Action,
}

fn default_action(code: KafkaCode) -> Action {
    use self::KafkaCode::*;

    match code {
        None => Action::NONE,

        // transient, coordinator/leader state is moving — refresh only
        LeaderNotAvailable | NotLeaderForPartition | BrokerNotAvailable |
        ReplicaNotAvailable | GroupCoordinatorNotAvailable | NotCoordinatorForGroup |
        WaitCoord =>
            Action::REFRESH,

        // transient, no refresh implied
        RequestTimedOut | NetworkException | GroupLoadInProgress | StaleControllerEpoch |
        UnknownTopicOrPartition | NotEnoughReplicas | NotEnoughReplicasAfterAppend |
        RebalanceInProgress => Action::RETRY,

        // group membership became stale; caller must rejoin, not just resend
        IllegalGeneration | UnknownMemberId | InconsistentGroupProtocol |
        InvalidGroupId => Action::PERMANENT | Action::INFORM | Action::SPECIAL,

        // permanent, caller-visible
        OffsetOutOfRange | CorruptMessage | InvalidMessageSize | MessageSizeTooLarge |
        OffsetMetadataTooLarge | InvalidTopic | RecordListTooLarge | InvalidRequiredAcks |
        InvalidCommitOffsetSize | InvalidTimestamp | UnsupportedSaslMechanism |
        IllegalSaslState | UnsupportedVersion | TopicAlreadyExists | InvalidPartitions |
        InvalidReplicationFactor | InvalidReplicaAssignment | InvalidConfig | NotController |
        InvalidRequest | UnsupportedForMessageFormat | PolicyViolation | InvalidSessionTimeout =>
            Action::PERMANENT | Action::INFORM,

        // permission errors: permanent, no point refreshing or retrying
        TopicAuthorizationFailed | GroupAuthorizationFailed | ClusterAuthorizationFailed =>
            Action::PERMANENT | Action::INFORM,

        Unknown => Action::PERMANENT | Action::INFORM,

        // client-local pseudo codes
        TimedOut | TimedOutQueue => Action::RETRY | Action::INFORM,
        Transport => Action::RETRY,
        Destroy => Action::IGNORE,
    }
}

/// Classify `code` into an `Action`. `overrides` is scanned in order and the
/// first match wins; `has_envelope` controls whether `RETRY` is allowed to
/// survive into the result.
pub fn classify(code: KafkaCode, overrides: &[Override], has_envelope: bool) -> Action {
    let action = overrides.iter()
        .find(|o| o.code == code)
        .map(|o| o.action)
        .unwrap_or_else(|| default_action(code));

    if has_envelope {
        action
    } else {
        action.remove(Action::RETRY)
    }
}
