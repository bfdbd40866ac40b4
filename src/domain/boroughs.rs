//! Borough normalization and suggestion.

use super::within_suggestion_distance;

/// The five canonical boroughs, stored lowercase
pub const BOROUGHS: [&str; 5] = ["manhattan", "brooklyn", "queens", "bronx", "staten island"];

/// Alias table for common shorthand. Keys are compared lowercase/trimmed.
const ALIASES: &[(&str, &str)] = &[
    ("nyc", "manhattan"),
    ("new york", "manhattan"),
    ("new york city", "manhattan"),
    ("bk", "brooklyn"),
    ("bklyn", "brooklyn"),
    ("si", "staten island"),
    ("staten", "staten island"),
    ("statenisland", "staten island"),
    ("the bronx", "bronx"),
    ("lic", "queens"),
];

/// Normalize a user-supplied borough to its canonical lowercase form.
///
/// Returns `None` for values that neither match a canonical borough nor an
/// alias.
pub fn normalize(input: &str) -> Option<&'static str> {
    let needle = input.trim().to_lowercase();

    if let Some(canonical) = BOROUGHS.iter().copied().find(|b| *b == needle) {
        return Some(canonical);
    }

    ALIASES
        .iter()
        .find(|(alias, _)| *alias == needle)
        .map(|(_, canonical)| *canonical)
}

/// Suggest canonical boroughs for an unknown input, nearest edit distance
/// first, capped at `max_suggestions`.
pub fn suggest(input: &str, max_suggestions: usize) -> Vec<&'static str> {
    let needle = input.trim().to_lowercase();

    let mut scored: Vec<(&'static str, usize)> = BOROUGHS
        .iter()
        .map(|b| (*b, strsim::levenshtein(&needle, b)))
        .filter(|(_, distance)| within_suggestion_distance(&needle, *distance))
        .collect();

    scored.sort_by_key(|(_, distance)| *distance);
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_passes_through() {
        assert_eq!(normalize("Brooklyn"), Some("brooklyn"));
        assert_eq!(normalize("staten island"), Some("staten island"));
    }

    #[test]
    fn nyc_normalizes_to_manhattan() {
        assert_eq!(normalize("nyc"), Some("manhattan"));
        assert_eq!(normalize("NYC"), Some("manhattan"));
    }

    #[test]
    fn si_normalizes_to_staten_island() {
        assert_eq!(normalize("si"), Some("staten island"));
    }

    #[test]
    fn unknown_borough_is_rejected() {
        assert_eq!(normalize("jersey city"), None);
    }

    #[test]
    fn typo_gets_a_suggestion() {
        let suggestions = suggest("manhatan", 3);
        assert!(suggestions.contains(&"manhattan"));
    }

    #[test]
    fn distant_input_gets_no_suggestions() {
        assert!(suggest("los angeles", 3).is_empty());
    }
}
