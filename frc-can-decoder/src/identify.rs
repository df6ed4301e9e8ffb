//! Best-guess device model identification
//!
//! A controller's observed API set is scored against the library profiles of
//! its manufacturer. Results are never cached: the API set keeps growing.

use crate::library::DeviceProfile;
use crate::session::Controller;
use std::collections::BTreeSet;

/// Name reported when no profile survives filtering
pub const UNKNOWN_DEVICE: &str = "Unknown";

/// A surviving profile and its score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileMatch<'a> {
    pub profile: &'a DeviceProfile,
    /// Number of `sometimes_used` APIs that were seen
    pub score: usize,
}

/// Name of the best matching profile, or [`UNKNOWN_DEVICE`]
pub fn identify(controller: &Controller, profiles: &[DeviceProfile]) -> String {
    best_match(controller.address().manufacturer, controller.apis_seen(), profiles)
        .map(|m| m.profile.name.clone())
        .unwrap_or_else(|| UNKNOWN_DEVICE.to_string())
}

/// Score every profile and pick the winner.
///
/// Profiles of other manufacturers, profiles with any `never_used` API seen,
/// and profiles with an unseen `always_used` API are discarded. The highest
/// score wins; equal scores go to the greatest name, so the result does not
/// depend on profile order.
pub fn best_match<'a>(
    manufacturer: u8,
    apis_seen: &BTreeSet<u16>,
    profiles: &'a [DeviceProfile],
) -> Option<ProfileMatch<'a>> {
    candidates(manufacturer, apis_seen, profiles).max_by(|a, b| {
        a.score
            .cmp(&b.score)
            .then_with(|| a.profile.name.cmp(&b.profile.name))
    })
}

/// Every profile that survives filtering, unsorted
pub fn candidates<'a: 'b, 'b>(
    manufacturer: u8,
    apis_seen: &'b BTreeSet<u16>,
    profiles: &'a [DeviceProfile],
) -> impl Iterator<Item = ProfileMatch<'a>> + 'b {
    profiles
        .iter()
        .filter(move |p| p.manufacturer == manufacturer)
        .filter(move |p| p.never_used.is_disjoint(apis_seen))
        .filter(move |p| p.always_used.is_subset(apis_seen))
        .map(move |profile| ProfileMatch {
            profile,
            score: profile.sometimes_used.intersection(apis_seen).count(),
        })
}
