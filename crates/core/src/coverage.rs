//! Coverage matching: per-unit overrides, geographic rules, and the
//! merge rule that reconciles the two.
//!
//! Two sources of truth disagree by design. Technical-access records are
//! authoritative statements about one building or apartment; coverage
//! rules are a provider's declared service area at city/street/house
//! granularity. The matchers here are pure set computations over both;
//! all fetching happens in the caller.

use serde::{Deserialize, Serialize};

use crate::address::AddressKey;
use crate::types::DbId;

/// How authoritative a resolution result is.
///
/// Gates caching: only `Exact` and `Range` results may be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    /// Backed by a per-unit technical-access record.
    Exact,
    /// Backed by a geographic coverage rule.
    Range,
    /// Nothing matched; the full active-provider list was substituted.
    None,
}

impl MatchTier {
    /// Lowercase string form, as used in responses and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Range => "range",
            Self::None => "none",
        }
    }

    /// Whether a result of this tier may be written to the cache.
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Granularity of a technical-access record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UnitScope {
    /// Applies to a whole building.
    Building,
    /// Applies to one apartment; beats a building record for the same
    /// provider (most-specific-wins).
    Apartment,
}

/// A technical-access record as the matcher sees it.
#[derive(Debug, Clone)]
pub struct AccessRecord {
    pub provider_id: DbId,
    pub scope: UnitScope,
    pub is_available: bool,
}

/// A provider's declared geographic service area.
///
/// Fetched from the Provider service; deserialized leniently. A rule
/// with neither street nor house bounds covers the whole city.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageRule {
    pub provider_id: DbId,
    pub city: String,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub house_from: Option<i64>,
    #[serde(default)]
    pub house_to: Option<i64>,
}

/// Result of the exact (per-unit) matcher.
#[derive(Debug, Clone, Default)]
pub struct ExactOutcome {
    /// Providers with a winning `is_available = true` record.
    pub include: Vec<DbId>,
    /// Providers with a winning `is_available = false` record. These
    /// suppress range matches for the same provider.
    pub deny: Vec<DbId>,
}

impl ExactOutcome {
    /// True when the unit has no positive override, which is what lets
    /// the range matcher run.
    pub fn has_positive(&self) -> bool {
        !self.include.is_empty()
    }
}

/// Merged resolution result.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// Deduplicated, sorted provider ids.
    pub provider_ids: Vec<DbId>,
    pub tier: MatchTier,
    /// Providers vetoed by an explicit negative override.
    pub denied: Vec<DbId>,
}

impl MatchOutcome {
    /// A pure deny-to-empty result is a legitimate "not available"
    /// answer; fallback only applies when nothing matched *and* nothing
    /// was denied.
    pub fn should_fall_back(&self) -> bool {
        self.provider_ids.is_empty() && self.denied.is_empty()
    }
}

/// Evaluate per-unit overrides, most-specific-wins.
///
/// For each provider the apartment-level record (when present) decides;
/// otherwise the building-level record does. Records with equal scope
/// for one provider should not coexist (enforced by a unique index), but
/// if they do, a negative record wins.
pub fn exact_outcome(records: &[AccessRecord]) -> ExactOutcome {
    use std::collections::HashMap;

    // provider -> winning (scope, is_available)
    let mut winners: HashMap<DbId, (UnitScope, bool)> = HashMap::new();
    for record in records {
        match winners.get(&record.provider_id) {
            Some((scope, available)) => {
                let wins = record.scope > *scope
                    || (record.scope == *scope && *available && !record.is_available);
                if wins {
                    winners.insert(record.provider_id, (record.scope, record.is_available));
                }
            }
            None => {
                winners.insert(record.provider_id, (record.scope, record.is_available));
            }
        }
    }

    let mut outcome = ExactOutcome::default();
    for (provider_id, (_, is_available)) in winners {
        if is_available {
            outcome.include.push(provider_id);
        } else {
            outcome.deny.push(provider_id);
        }
    }
    outcome.include.sort_unstable();
    outcome.deny.sort_unstable();
    outcome
}

/// Whether a coverage rule covers the given normalized address.
///
/// City comparison is case-insensitive (rules arrive as the provider
/// typed them). Street must match exactly when the rule names one. House
/// bounds, when present, require a numeric house value inside them.
pub fn rule_matches(rule: &CoverageRule, key: &AddressKey) -> bool {
    let Some(city) = key.city.as_deref() else {
        return false;
    };
    if rule.city.trim().to_lowercase() != city {
        return false;
    }

    if let Some(rule_street) = rule.street.as_deref() {
        match key.street.as_deref() {
            Some(street) if rule_street.trim().to_lowercase() == street => {}
            _ => return false,
        }
    }

    if rule.house_from.is_some() || rule.house_to.is_some() {
        let Some(house) = key.house_number() else {
            return false;
        };
        if rule.house_from.is_some_and(|from| house < from) {
            return false;
        }
        if rule.house_to.is_some_and(|to| house > to) {
            return false;
        }
    }

    true
}

/// Providers whose coverage rules include the given address.
///
/// A provider is included if any of its rules matches; deduplicated and
/// sorted.
pub fn range_provider_ids(rules: &[CoverageRule], key: &AddressKey) -> Vec<DbId> {
    let mut ids: Vec<DbId> = rules
        .iter()
        .filter(|rule| rule_matches(rule, key))
        .map(|rule| rule.provider_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Merge exact and range results: `(include ∪ range) \ deny`.
///
/// The tier reflects the strongest evidence present: any surviving exact
/// include makes the result exact-tier; otherwise surviving range
/// matches make it range-tier. An empty merge with a non-empty deny set
/// is still exact-tier — an authoritative "nobody serves this unit" —
/// while an empty merge with nothing denied is none-tier (the caller
/// consults [`MatchOutcome::should_fall_back`]).
pub fn merge(exact: &ExactOutcome, range_ids: &[DbId]) -> MatchOutcome {
    let mut ids: Vec<DbId> = exact
        .include
        .iter()
        .chain(range_ids.iter())
        .copied()
        .filter(|id| !exact.deny.contains(id))
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let tier = if ids.iter().any(|id| exact.include.contains(id)) {
        MatchTier::Exact
    } else if !ids.is_empty() {
        MatchTier::Range
    } else if !exact.deny.is_empty() {
        MatchTier::Exact
    } else {
        MatchTier::None
    };

    MatchOutcome {
        provider_ids: ids,
        tier,
        denied: exact.deny.clone(),
    }
}
