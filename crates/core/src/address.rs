//! Address normalization and fingerprinting.
//!
//! Raw address input arrives in whatever shape the customer (or the
//! back office) typed it: mixed case, stray whitespace, "ул."/"г."/"д."
//! prefixes. [`normalize`] reduces it to a stable [`AddressKey`] so that
//! equivalent addresses compare equal, and [`address_hash`] digests the
//! key into the cache lookup fingerprint.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::DbId;

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static CITY_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:г\.|гор\.|город)\s*").expect("valid regex"));

static STREET_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:ул\.|улица|пр\.|проспект)\s*").expect("valid regex"));

static HOUSE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:д\.|дом)\s*").expect("valid regex"));

static HOUSE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+").expect("valid regex"));

/// Structured address fields as supplied by the caller.
///
/// Free-text input is split into these fields upstream (by the Location
/// service or the UI form); this engine never parses prose.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddressInput {
    pub city: Option<String>,
    pub street: Option<String>,
    pub house: Option<String>,
    pub building_id: Option<DbId>,
    pub apartment_id: Option<DbId>,
}

impl AddressInput {
    /// True when not a single address component is present.
    pub fn is_empty(&self) -> bool {
        self.city.is_none()
            && self.street.is_none()
            && self.house.is_none()
            && self.building_id.is_none()
            && self.apartment_id.is_none()
    }
}

/// Canonical form of an address.
///
/// City/street/house are lower-cased, trimmed, whitespace-collapsed, and
/// stripped of their type prefixes. The `house` field keeps any letter
/// suffix ("9к6") for display; [`house_number`](Self::house_number)
/// exposes the leading numeric run that range matching uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressKey {
    pub city: Option<String>,
    pub street: Option<String>,
    pub house: Option<String>,
    pub building_id: Option<DbId>,
    pub apartment_id: Option<DbId>,
}

impl AddressKey {
    /// Leading numeric run of the house field ("9к6" -> 9).
    ///
    /// `None` when the house is absent or does not start with a digit.
    pub fn house_number(&self) -> Option<i64> {
        let house = self.house.as_deref()?;
        let m = HOUSE_NUMBER_RE.find(house)?;
        m.as_str().parse().ok()
    }

    /// True when the key carries a unit identifier usable for exact matching.
    pub fn has_unit_ref(&self) -> bool {
        self.building_id.is_some() || self.apartment_id.is_some()
    }
}

/// Canonicalize raw address input into a stable [`AddressKey`].
///
/// Idempotent: feeding the normalized fields back through produces the
/// same key. Empty-after-trim components collapse to `None`.
pub fn normalize(input: &AddressInput) -> AddressKey {
    AddressKey {
        city: normalize_component(input.city.as_deref(), &CITY_PREFIX_RE),
        street: normalize_component(input.street.as_deref(), &STREET_PREFIX_RE),
        house: normalize_component(input.house.as_deref(), &HOUSE_PREFIX_RE),
        building_id: input.building_id,
        apartment_id: input.apartment_id,
    }
}

/// Lower-case, trim, collapse inner whitespace, strip the type prefix.
fn normalize_component(value: Option<&str>, prefix: &Regex) -> Option<String> {
    let value = value?.trim().to_lowercase();
    let value = WHITESPACE_RE.replace_all(&value, " ");
    let value = prefix.replace(value.trim(), "");
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Deterministic SHA-256 fingerprint of an [`AddressKey`].
///
/// Hashes the ordered tuple (city, street, house, building_id,
/// apartment_id) with a field separator so adjacent fields cannot bleed
/// into each other. Used solely as the cache lookup key.
pub fn address_hash(key: &AddressKey) -> String {
    let mut hasher = Sha256::new();
    for part in [
        key.city.as_deref().unwrap_or(""),
        key.street.as_deref().unwrap_or(""),
        key.house.as_deref().unwrap_or(""),
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    for id in [key.building_id, key.apartment_id] {
        match id {
            Some(id) => hasher.update(id.to_be_bytes()),
            None => hasher.update(b"-"),
        }
        hasher.update([0x1f]);
    }
    format!("{:x}", hasher.finalize())
}
