//! Version negotiation.
//!
//! Given what a caller's code supports (`[min_supported, max_supported]`)
//! and what a broker advertised for the same API key (from an ApiVersions
//! reply), picks the highest version both sides agree on. Also derives a
//! small feature-bit mask from the negotiated table, so call sites that
//! need to know "can I send a non-sentinel ListOffsets timestamp" don't
//! have to re-derive it from raw version numbers themselves.

use std::cmp;

use errors::{ErrorKind, Result};
use protocol::ApiKeys;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerApiVersion {
    pub api_key: i16,
    pub min_version: i16,
    pub max_version: i16,
}

/// A decoded ApiVersions reply, sorted by `api_key` ascending (see
/// `protocol::api_versions::decode_api_versions`) so lookups can binary
/// search instead of scanning linearly.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiVersionTable(Vec<BrokerApiVersion>);

impl ApiVersionTable {
    pub fn new(mut entries: Vec<BrokerApiVersion>) -> ApiVersionTable {
        entries.sort_by_key(|e| e.api_key);
        ApiVersionTable(entries)
    }

    pub fn get(&self, api_key: ApiKeys) -> Option<BrokerApiVersion> {
        self.0.binary_search_by_key(&(api_key as i16), |e| e.api_key)
            .ok()
            .map(|i| self.0[i])
    }
}

/// Feature bits derived from a negotiated version, one per protocol detail
/// a call site needs to branch on without re-deriving it from raw numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags(u8);

impl FeatureFlags {
    pub const NONE: FeatureFlags = FeatureFlags(0);
    /// ListOffsets `v >= 1`: the request may carry an arbitrary timestamp
    /// rather than just the `-1`/`-2` sentinels.
    pub const OFFSET_TIME: FeatureFlags = FeatureFlags(1 << 0);
    /// Produce/Fetch `v >= 1`: responses carry a `throttle_time_ms` field.
    pub const THROTTLE_TIME: FeatureFlags = FeatureFlags(1 << 1);
    /// Dynamic version negotiation is in play at all (an ApiVersions call
    /// succeeded) as opposed to falling back to the lowest common version.
    pub const DYNAMIC_VERSIONING: FeatureFlags = FeatureFlags(1 << 2);

    pub fn contains(&self, other: FeatureFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl ::std::ops::BitOr for FeatureFlags {
    type Output = FeatureFlags;
    fn bitor(self, rhs: FeatureFlags) -> FeatureFlags {
        FeatureFlags(self.0 | rhs.0)
    }
}

/// Picks the highest version in `[max(min_req, broker.min), min(max_req,
/// broker.max)]`. Returns `UnsupportedFeature` if that range is empty, or
/// if the broker never advertised this API key at all.
pub fn negotiate(api_key: ApiKeys, min_req: i16, max_req: i16, table: &ApiVersionTable) -> Result<i16> {
    let broker = table.get(api_key)
        .ok_or_else(|| ErrorKind::UnsupportedFeature(api_key as i16, min_req, max_req))?;

    let lo = cmp::max(min_req, broker.min_version);
    let hi = cmp::min(max_req, broker.max_version);

    if lo > hi {
        bail!(ErrorKind::UnsupportedFeature(api_key as i16, min_req, max_req));
    }

    Ok(hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ApiVersionTable {
        ApiVersionTable::new(vec![
            BrokerApiVersion { api_key: ApiKeys::Offsets as i16, min_version: 0, max_version: 1 },
            BrokerApiVersion { api_key: ApiKeys::Metadata as i16, min_version: 0, max_version: 2 },
        ])
    }

    #[test]
    fn negotiate_picks_the_highest_mutually_supported_version() {
        let v = negotiate(ApiKeys::Metadata, 0, 5, &table()).unwrap();
        assert_eq!(v, 2);
    }

    #[test]
    fn negotiate_fails_when_ranges_do_not_overlap() {
        let err = negotiate(ApiKeys::Offsets, 2, 5, &table());
        assert!(err.is_err());
    }

    #[test]
    fn negotiate_fails_when_broker_never_advertised_the_api() {
        let err = negotiate(ApiKeys::Produce, 0, 1, &table());
        assert!(err.is_err());
    }
}
