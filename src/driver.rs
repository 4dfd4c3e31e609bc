//! C8 — the retry/refresh driver.
//!
//! `classify` (C7) is a pure function; this module is where its verdict
//! turns into behavior against a live envelope and its collaborators.
//! Each protocol handler calls exactly the helper relevant to it, passing
//! whichever collaborator it already has in scope — there is no single
//! "do everything" entry point, since a Produce failure has nothing to do
//! with a group coordinator and forcing every call site through one
//! function would just mean most of its parameters go unused most of the
//! time.

use classify::Action;
use envelope::RequestEnvelope;
use errors::KafkaCode;

/// What the caller should do with a failed request once the driver has
/// looked at both the classifier's verdict and the envelope's own retry
/// budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Resend the request; the envelope's retry budget was decremented.
    Retry,
    /// No retries left, or the error was classified permanent; surface it.
    Terminal(bool /* inform */),
    /// Drop the error without surfacing it to the caller.
    Ignore,
}

/// Turns a classified `Action` into a concrete disposition for `envelope`,
/// consuming one unit of its retry budget if it decides to retry.
pub fn decide(action: Action, envelope: &mut RequestEnvelope) -> Disposition {
    if action.contains(Action::IGNORE) {
        return Disposition::Ignore;
    }

    if action.contains(Action::RETRY) && envelope.has_retries() {
        envelope.retries_remaining -= 1;
        return Disposition::Retry;
    }

    Disposition::Terminal(action.contains(Action::INFORM))
}

/// Topic/partition metadata is stale; the caller should invalidate its
/// cached view for `topic` before the retried request goes out, so the
/// retry targets the broker that's actually the leader now.
pub trait MetadataRefresh {
    fn invalidate_topic(&self, topic: &str);
}

/// Group-coordinator-specific refresh hooks: a harsher one that declares
/// the cached coordinator dead and schedules rediscovery, and a lighter
/// one that just prods the group subsystem to check on the coordinator.
pub trait GroupRefresh {
    /// The cached coordinator for `group_id` is wrong or dead; drop it so
    /// the next request triggers a fresh `GroupCoordinator` lookup.
    fn invalidate_coordinator(&self, group_id: &str);

    /// The coordinator for `group_id` might be stale, but not certainly
    /// dead — ask the group subsystem to check on it rather than tearing
    /// the cached value down outright.
    fn coord_query(&self, group_id: &str);
}

/// Applies `Action::REFRESH` against a topic-level collaborator. A no-op
/// when the action doesn't call for it, so callers can invoke this
/// unconditionally after `decide`.
pub fn refresh<R: MetadataRefresh>(action: Action, topic: &str, hooks: &R) {
    if action.contains(Action::REFRESH) {
        hooks.invalidate_topic(topic);
    }
}

/// Applies `Action::REFRESH` for group-coordinator errors against a
/// group-level collaborator. `Refresh | Special` invalidates the cached
/// coordinator outright and schedules rediscovery; plain `Refresh` (e.g. a
/// lookup already in flight, or a coordinator that merely moved) only asks
/// the group subsystem to check on it. A no-op when `Refresh` isn't set, so
/// callers can invoke this unconditionally after `decide`.
pub fn group_refresh<R: GroupRefresh>(action: Action, group_id: &str, hooks: &R) {
    if !action.contains(Action::REFRESH) {
        return;
    }

    if action.contains(Action::SPECIAL) {
        hooks.invalidate_coordinator(group_id);
    } else {
        hooks.coord_query(group_id);
    }
}
