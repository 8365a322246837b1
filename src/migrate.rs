//! Versioned upgrade of stored exercise records.
//!
//! Version 0 records are untagged. The oldest of them carry a single
//! `muscleGroup` string instead of the `muscleGroups` list. Every record that
//! passes through [`upgrade_exercises`] leaves tagged with
//! [`CURRENT_SCHEMA_VERSION`], so later loads never inspect the shape again.

use serde_json::{Map, Value};

use crate::model::Exercise;

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

pub const FALLBACK_MUSCLE_GROUP: &str = "Otros";

/// Secondary groups implied by a legacy primary group and a name fragment.
const COMPANION_GROUPS: &[(&str, &str, &[&str])] = &[
    ("Pecho", "Press", &["Tríceps", "Hombros"]),
    ("Espalda", "Dominada", &["Bíceps"]),
];

fn schema_version(record: &Map<String, Value>) -> u32 {
    record
        .get("schemaVersion")
        .and_then(Value::as_u64)
        .map(|v| v as u32)
        .unwrap_or(0)
}

fn upgrade_v0(record: &mut Map<String, Value>) {
    let has_groups = record
        .get("muscleGroups")
        .and_then(Value::as_array)
        .is_some_and(|groups| !groups.is_empty());
    if !has_groups {
        let primary = record
            .get("muscleGroup")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(FALLBACK_MUSCLE_GROUP)
            .to_string();
        let name = record.get("name").and_then(Value::as_str).unwrap_or("");
        let mut groups = vec![primary.clone()];
        for (group, fragment, companions) in COMPANION_GROUPS {
            if primary == *group && name.contains(fragment) {
                groups.extend(companions.iter().map(|c| c.to_string()));
            }
        }
        log::debug!("Upgrading legacy exercise {name:?} to groups {groups:?}");
        record.insert(
            "muscleGroups".into(),
            Value::Array(groups.into_iter().map(Value::String).collect()),
        );
    }
    record.remove("muscleGroup");
}

/// Upgrade a single stored record to the current schema.
pub fn upgrade_record(mut value: Value) -> Value {
    if let Some(record) = value.as_object_mut() {
        let version = schema_version(record);
        if version < 1 {
            upgrade_v0(record);
        }
        if version < CURRENT_SCHEMA_VERSION {
            record.insert("schemaVersion".into(), Value::from(CURRENT_SCHEMA_VERSION));
        }
    }
    value
}

/// Upgrade and deserialize a stored exercise list.
///
/// Records that still fail to deserialize after the upgrade are dropped with
/// a warning rather than failing the whole load.
pub fn upgrade_exercises(raw: Value) -> Vec<Exercise> {
    let Value::Array(records) = raw else {
        log::warn!("Stored exercise library is not a list; ignoring it");
        return Vec::new();
    };
    records
        .into_iter()
        .map(upgrade_record)
        .filter_map(|record| match serde_json::from_value::<Exercise>(record) {
            Ok(ex) => Some(ex),
            Err(e) => {
                log::warn!("Dropping unreadable exercise record: {e}");
                None
            }
        })
        .collect()
}

/// Upgrade and deserialize an exercise list, failing on the first record
/// that cannot be read. Used where partial data must not be applied.
pub fn upgrade_exercises_strict(raw: Value) -> Result<Vec<Exercise>, serde_json::Error> {
    let records: Vec<Value> = serde_json::from_value(raw)?;
    records
        .into_iter()
        .map(|record| serde_json::from_value(upgrade_record(record)))
        .collect()
}
