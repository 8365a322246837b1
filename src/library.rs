//! Exercise library queries.

use std::collections::BTreeMap;

use crate::model::Exercise;

/// How to bucket exercises for browsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Muscle,
    Equipment,
}

/// Case-insensitive match on name, any muscle group or equipment.
pub fn search<'a>(exercises: &'a [Exercise], term: &str) -> Vec<&'a Exercise> {
    let needle = term.trim().to_lowercase();
    exercises
        .iter()
        .filter(|ex| {
            needle.is_empty()
                || ex.name.to_lowercase().contains(&needle)
                || ex
                    .muscle_groups
                    .iter()
                    .any(|m| m.to_lowercase().contains(&needle))
                || ex.equipment.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Bucket exercises by primary muscle group or equipment, keys sorted.
pub fn group<'a>(exercises: &[&'a Exercise], by: GroupBy) -> BTreeMap<String, Vec<&'a Exercise>> {
    let mut map: BTreeMap<String, Vec<&'a Exercise>> = BTreeMap::new();
    for ex in exercises {
        let key = match by {
            GroupBy::Muscle => ex.primary_muscle().to_string(),
            GroupBy::Equipment if ex.equipment.is_empty() => "Otros".to_string(),
            GroupBy::Equipment => ex.equipment.clone(),
        };
        map.entry(key).or_default().push(*ex);
    }
    map
}

/// Exact id match, then exact case-insensitive name, then the closest name
/// by Jaro-Winkler similarity above `threshold`.
pub fn find<'a>(exercises: &'a [Exercise], query: &str, threshold: f64) -> Option<&'a Exercise> {
    if let Some(ex) = exercises.iter().find(|e| e.id == query) {
        return Some(ex);
    }
    let lowered = query.to_lowercase();
    if let Some(ex) = exercises.iter().find(|e| e.name.to_lowercase() == lowered) {
        return Some(ex);
    }
    exercises
        .iter()
        .map(|e| (e, strsim::jaro_winkler(&e.name.to_lowercase(), &lowered)))
        .filter(|(_, score)| *score >= threshold)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(e, _)| e)
}

/// Replace the exercise with the same id. Returns `false` when absent.
pub fn update(exercises: &mut [Exercise], updated: Exercise) -> bool {
    match exercises.iter_mut().find(|e| e.id == updated.id) {
        Some(slot) => {
            *slot = updated;
            true
        }
        None => false,
    }
}

/// Remove an exercise by id. Returns `false` when absent.
pub fn remove(exercises: &mut Vec<Exercise>, id: &str) -> bool {
    let before = exercises.len();
    exercises.retain(|e| e.id != id);
    exercises.len() != before
}
