//! Canonical listing tags, their display labels, and tag categories.
//!
//! Tags are optional flavor rather than hard constraints: invalid tags are
//! silently dropped during validation, never retried.

/// System tag to display label mapping
const TAG_LABELS: &[(&str, &str)] = &[
    // Price category
    ("price-drop", "Price Drop 📉"),
    ("great-deal", "Great Deal 💰"),
    ("price-increase", "Price 📈"),
    ("discounted", "Discounted 🔖"),
    ("underpriced", "Underpriced 🤫"),
    // Features category
    ("luxury", "Luxury 💎"),
    ("renovated", "Renovated 🔨"),
    ("open-house", "Open House 🏠"),
    ("furnished", "Furnished 🛋️"),
    ("home-office", "Home Office 💻"),
    ("pet-friendly", "Pet Friendly 🐾"),
    ("spacious", "Spacious 🏡"),
    ("cozy", "Cozy 🔥"),
    // Location category
    ("near-subway", "Near Subway 🚇"),
    ("park-view", "Park View 🌳"),
    ("city-center", "City Center 🏙️"),
    ("quiet-neighborhood", "Quiet Neighborhood 🤫"),
    ("waterfront", "Waterfront 🌊"),
    // Popularity category
    ("new", "New ✨"),
    ("popular", "Popular 🔥"),
    ("short-term", "Short Term 🕒"),
    ("trending", "Trending 📈"),
    // Amenities category
    ("solar-powered", "Solar Powered ☀️"),
    ("eco-friendly", "Eco Friendly 🌿"),
    ("modern-design", "Modern Design 🆕"),
    ("gym", "Gym 💪"),
    ("pool", "Pool 🏊"),
    ("rooftop-access", "Rooftop Access 🚀"),
    ("concierge-service", "Concierge Service 🤵"),
    // Transportation category
    ("walk-score-high", "Walk Score High 🚶"),
    ("close-to-bus-stop", "Close to Bus Stop 🚌"),
    ("close-to-train-station", "Close to Train Station 🚉"),
    ("bike-friendly", "Bike Friendly 🚴"),
];

/// Tag categories, used when injecting the vocabulary into the model prompt
pub const TAG_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Price",
        &["price-drop", "great-deal", "price-increase", "discounted", "underpriced"],
    ),
    (
        "Features",
        &[
            "luxury",
            "renovated",
            "open-house",
            "furnished",
            "home-office",
            "pet-friendly",
            "spacious",
            "cozy",
        ],
    ),
    (
        "Location",
        &["near-subway", "park-view", "city-center", "quiet-neighborhood", "waterfront"],
    ),
    ("Popularity", &["new", "popular", "short-term", "trending"]),
    (
        "Amenities",
        &[
            "solar-powered",
            "eco-friendly",
            "modern-design",
            "gym",
            "pool",
            "rooftop-access",
            "concierge-service",
        ],
    ),
    (
        "Transportation",
        &["walk-score-high", "close-to-bus-stop", "close-to-train-station", "bike-friendly"],
    ),
];

/// Resolve a user-supplied tag to its canonical system form.
///
/// Accepts the system form case-insensitively, or a display label.
pub fn resolve(input: &str) -> Option<&'static str> {
    let lower = input.trim().to_lowercase();

    if let Some((system, _)) = TAG_LABELS.iter().find(|(system, _)| *system == lower) {
        return Some(*system);
    }

    // Display label (exact, then case-insensitive)
    TAG_LABELS
        .iter()
        .find(|(_, label)| *label == input || label.to_lowercase() == lower)
        .map(|(system, _)| *system)
}

/// Resolve a tag list, silently dropping anything unknown.
pub fn resolve_all(inputs: &[String]) -> (Vec<&'static str>, Vec<String>) {
    let mut resolved = Vec::new();
    let mut dropped = Vec::new();
    for input in inputs {
        match resolve(input) {
            Some(tag) if !resolved.contains(&tag) => resolved.push(tag),
            Some(_) => {}
            None => dropped.push(input.clone()),
        }
    }
    (resolved, dropped)
}

/// Display label for a system tag (falls back to the tag itself)
pub fn display_label(system_tag: &str) -> &str {
    TAG_LABELS
        .iter()
        .find(|(system, _)| *system == system_tag)
        .map(|(_, label)| *label)
        .unwrap_or(system_tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_tag_resolves_case_insensitively() {
        assert_eq!(resolve("LUXURY"), Some("luxury"));
    }

    #[test]
    fn display_label_resolves_back_to_system_tag() {
        assert_eq!(resolve("Near Subway 🚇"), Some("near-subway"));
    }

    #[test]
    fn unknown_tag_is_dropped() {
        let (resolved, dropped) =
            resolve_all(&["luxury".to_string(), "charming".to_string()]);
        assert_eq!(resolved, vec!["luxury"]);
        assert_eq!(dropped, vec!["charming".to_string()]);
    }

    #[test]
    fn duplicate_tags_collapse() {
        let (resolved, dropped) = resolve_all(&["gym".to_string(), "Gym".to_string()]);
        assert_eq!(resolved, vec!["gym"]);
        assert!(dropped.is_empty());
    }

    #[test]
    fn labels_round_trip() {
        assert_eq!(display_label("great-deal"), "Great Deal 💰");
        assert_eq!(display_label("not-a-tag"), "not-a-tag");
    }
}
