//! Domain validators: stateless or cached lookups against reference data.
//!
//! Boroughs, amenities, and tags are fixed vocabularies compiled into the
//! binary; neighborhoods are a DB-backed catalog loaded once per process.

pub mod amenities;
pub mod boroughs;
pub mod neighborhoods;
pub mod tags;

pub use neighborhoods::{NeighborhoodCatalog, NeighborhoodRecord};

/// Suggestions are only offered when the edit distance is plausibly a typo:
/// strictly less than `max(3, input_length / 2)`.
pub(crate) fn within_suggestion_distance(input: &str, distance: usize) -> bool {
    distance < std::cmp::max(3, input.chars().count() / 2)
}
