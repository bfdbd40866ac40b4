//! Amenity resolution against the canonical amenity vocabulary.
//!
//! Resolution is staged: exact match, case-insensitive match, alias table,
//! then separator normalization (spaces/hyphens to underscores). Unresolved
//! amenities are a retryable validation error, without suggestions.

/// Canonical amenity names as stored on the listings view
pub const AMENITIES: &[&str] = &[
    "pets",
    "media_room",
    "hardwood_floors",
    "recreation_facilities",
    "dogs",
    "storage_room",
    "roofdeck",
    "childrens_playroom",
    "nyc_evacuation_1",
    "fios_available",
    "balcony",
    "doorman",
    "bike_room",
    "furnished",
    "hot_tub",
    "nyc_evacuation_6",
    "public_outdoor_space",
    "full_time_doorman",
    "locker_cage",
    "park_view",
    "nyc_evacuation_3",
    "garage",
    "waterview",
    "part_time_doorman",
    "tennis_court",
    "leed_registered",
    "garden",
    "valet",
    "fireplace",
    "gas_fireplace",
    "wheelchair_access",
    "deck",
    "waterfront",
    "city_view",
    "elevator",
    "co_purchase",
    "dishwasher",
    "courtyard",
    "washer_dryer",
    "pool",
    "garden_view",
    "sublets",
    "decorative_fireplace",
    "parents",
    "concierge",
    "terrace",
    "cold_storage",
    "virtual_doorman",
    "pied_a_terre",
    "guarantors",
    "smoke_free",
    "gym",
    "cats",
    "valet_parking",
    "laundry",
    "nyc_evacuation_2",
    "central_ac",
    "private_roof_deck",
    "roof_rights",
    "patio",
    "wood_fireplace",
    "assigned_parking",
    "parking",
    "package_room",
    "skyline_view",
    "live_in_super",
    "storage",
    "nyc_evacuation_5",
];

/// Alias table for colloquial amenity names
const ALIASES: &[(&str, &str)] = &[
    ("a/c", "central_ac"),
    ("ac", "central_ac"),
    ("air conditioning", "central_ac"),
    ("central air", "central_ac"),
    ("washer/dryer", "washer_dryer"),
    ("w/d", "washer_dryer"),
    ("in-unit laundry", "washer_dryer"),
    ("laundry room", "laundry"),
    ("roof deck", "roofdeck"),
    ("rooftop", "roofdeck"),
    ("pet friendly", "pets"),
    ("pet-friendly", "pets"),
    ("fitness center", "gym"),
    ("swimming pool", "pool"),
    ("wheelchair accessible", "wheelchair_access"),
];

/// Resolve one user-supplied amenity to its canonical name.
pub fn resolve(input: &str) -> Option<&'static str> {
    // Stage 1: exact match
    if let Some(found) = AMENITIES.iter().copied().find(|a| *a == input) {
        return Some(found);
    }

    // Stage 2: case-insensitive match
    let lower = input.trim().to_lowercase();
    if let Some(found) = AMENITIES.iter().copied().find(|a| *a == lower) {
        return Some(found);
    }

    // Stage 3: alias table
    if let Some((_, canonical)) = ALIASES.iter().find(|(alias, _)| *alias == lower) {
        return Some(*canonical);
    }

    // Stage 4: separator normalization
    let normalized: String = lower
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect();
    AMENITIES.iter().find(|a| **a == normalized).copied()
}

/// Split a list of amenities into resolved canonical names and unresolved
/// inputs, preserving order.
pub fn resolve_all(inputs: &[String]) -> (Vec<&'static str>, Vec<String>) {
    let mut resolved = Vec::new();
    let mut unresolved = Vec::new();
    for input in inputs {
        match resolve(input) {
            Some(canonical) => resolved.push(canonical),
            None => unresolved.push(input.clone()),
        }
    }
    (resolved, unresolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_resolves() {
        assert_eq!(resolve("doorman"), Some("doorman"));
    }

    #[test]
    fn case_insensitive_match_resolves() {
        assert_eq!(resolve("Gym"), Some("gym"));
    }

    #[test]
    fn alias_resolves() {
        assert_eq!(resolve("a/c"), Some("central_ac"));
        assert_eq!(resolve("w/d"), Some("washer_dryer"));
    }

    #[test]
    fn separator_normalization_resolves() {
        assert_eq!(resolve("hardwood floors"), Some("hardwood_floors"));
        assert_eq!(resolve("bike-room"), Some("bike_room"));
    }

    #[test]
    fn unknown_amenity_stays_unresolved() {
        let (resolved, unresolved) =
            resolve_all(&["gym".to_string(), "teleporter".to_string()]);
        assert_eq!(resolved, vec!["gym"]);
        assert_eq!(unresolved, vec!["teleporter".to_string()]);
    }
}
