//! Neighborhood catalog: DB-backed allowlist and hierarchy expansion.
//!
//! The catalog is loaded from `real_estate.neighborhoods_enhanced_view`
//! once per process and kept in memory. Hierarchy is encoded in a
//! materialized path column; a neighborhood's descendants are exactly the
//! rows whose path extends its own.

use std::collections::{HashMap, HashSet};

use super::within_suggestion_distance;

/// Neighborhood levels considered searchable (injected into the model
/// context and accepted by validation)
const SEARCHABLE_LEVELS: [i32; 3] = [3, 4, 5];

/// One row of the neighborhood hierarchy view
#[derive(Debug, Clone)]
pub struct NeighborhoodRecord {
    pub name: String,
    pub level: i32,
    pub hierarchy_path: String,
}

/// In-memory neighborhood reference data
#[derive(Debug, Default)]
pub struct NeighborhoodCatalog {
    /// Lowercased searchable names, for validation
    valid_names: HashSet<String>,
    /// Lowercased name -> materialized path, all levels
    paths: HashMap<String, String>,
    /// (path, name) pairs for descendant scans
    records: Vec<(String, String)>,
}

impl NeighborhoodCatalog {
    pub fn from_records(records: Vec<NeighborhoodRecord>) -> Self {
        let mut valid_names = HashSet::new();
        let mut paths = HashMap::new();
        let mut pairs = Vec::with_capacity(records.len());

        for record in records {
            let lower = record.name.to_lowercase();
            if SEARCHABLE_LEVELS.contains(&record.level) {
                valid_names.insert(lower.clone());
            }
            paths.insert(lower, record.hierarchy_path.clone());
            pairs.push((record.hierarchy_path, record.name));
        }

        Self {
            valid_names,
            paths,
            records: pairs,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.valid_names.is_empty()
    }

    /// Case-insensitive membership in the searchable allowlist
    pub fn contains(&self, name: &str) -> bool {
        self.valid_names.contains(&name.to_lowercase())
    }

    /// Searchable names, sorted, for injection into the model context
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.valid_names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Suggest similar neighborhood names for a batch of invalid inputs.
    ///
    /// At most `max_suggestions` names total across all inputs, nearest
    /// edit distance first, each within the typo threshold.
    pub fn suggest(&self, invalid: &[String], max_suggestions: usize) -> Vec<String> {
        let mut suggestions: Vec<String> = Vec::new();

        for input in invalid {
            let needle = input.to_lowercase();
            let mut scored: Vec<(&String, usize)> = self
                .valid_names
                .iter()
                .map(|name| (name, strsim::levenshtein(&needle, name)))
                .collect();
            scored.sort_by_key(|(_, distance)| *distance);

            for (name, distance) in scored.into_iter().take(max_suggestions) {
                if within_suggestion_distance(&needle, distance)
                    && !suggestions.contains(name)
                {
                    suggestions.push(name.clone());
                }
            }
        }

        suggestions.truncate(max_suggestions);
        suggestions
    }

    /// Expand a neighborhood to itself plus all descendants, formatted the
    /// way the listings view stores them (lowercase, spaces to hyphens).
    ///
    /// Unknown names pass through formatted as-is so a stale catalog never
    /// drops a constraint.
    pub fn expand_with_descendants(&self, name: &str) -> Vec<String> {
        let lower = name.to_lowercase();

        let Some(parent_path) = self.paths.get(&lower) else {
            return vec![slugify(&lower)];
        };

        let mut expanded: Vec<String> = self
            .records
            .iter()
            .filter(|(path, _)| path.starts_with(parent_path.as_str()))
            .map(|(_, child)| slugify(&child.to_lowercase()))
            .collect();

        expanded.sort_unstable();
        expanded.dedup();
        expanded
    }
}

/// Lowercase-hyphen normalization used by the listings view
fn slugify(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> NeighborhoodCatalog {
        NeighborhoodCatalog::from_records(vec![
            NeighborhoodRecord {
                name: "Manhattan".into(),
                level: 1,
                hierarchy_path: "1/".into(),
            },
            NeighborhoodRecord {
                name: "Chelsea".into(),
                level: 3,
                hierarchy_path: "1/8/".into(),
            },
            NeighborhoodRecord {
                name: "West Chelsea".into(),
                level: 4,
                hierarchy_path: "1/8/2/".into(),
            },
            NeighborhoodRecord {
                name: "Williamsburg".into(),
                level: 3,
                hierarchy_path: "2/4/".into(),
            },
        ])
    }

    #[test]
    fn membership_is_case_insensitive() {
        let catalog = catalog();
        assert!(catalog.contains("Chelsea"));
        assert!(catalog.contains("chelsea"));
        assert!(!catalog.contains("chelsa"));
    }

    #[test]
    fn level_filter_excludes_top_level_rows() {
        // "Manhattan" is level 1: present in the hierarchy, not searchable
        let catalog = catalog();
        assert!(!catalog.contains("manhattan"));
    }

    #[test]
    fn expansion_includes_descendants_and_slugifies() {
        let catalog = catalog();
        let expanded = catalog.expand_with_descendants("Chelsea");
        assert_eq!(expanded, vec!["chelsea".to_string(), "west-chelsea".to_string()]);
    }

    #[test]
    fn expansion_of_unknown_name_passes_through() {
        let catalog = catalog();
        assert_eq!(
            catalog.expand_with_descendants("Long Island City"),
            vec!["long-island-city".to_string()]
        );
    }

    #[test]
    fn typo_suggestion_respects_threshold() {
        let catalog = catalog();
        let suggestions = catalog.suggest(&["chelsa".to_string()], 3);
        assert_eq!(suggestions, vec!["chelsea".to_string()]);

        let none = catalog.suggest(&["xyzzy".to_string()], 3);
        assert!(none.is_empty());
    }
}
