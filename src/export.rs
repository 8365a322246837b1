use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::io::Write;
use std::path::Path;

use crate::error::ImportError;
use crate::migrate::upgrade_exercises_strict;
use crate::model::{
    BodyMetric, ChatSession, CompletedWorkout, Exercise, Routine, UserProfile,
};
use crate::units::{WeightUnit, parse_weight_kg};

pub const BACKUP_VERSION: &str = "1.0";

/// Full backup document as written by [`write_backup`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup<'a> {
    pub version: &'static str,
    pub date: String,
    pub user_profile: Option<&'a UserProfile>,
    pub weight_unit: WeightUnit,
    pub exercises: &'a [Exercise],
    pub routines: &'a [Routine],
    pub history: &'a [CompletedWorkout],
    pub metrics: &'a [BodyMetric],
    pub chats: &'a [ChatSession],
}

/// A parsed backup. Absent fields leave the current data untouched on import.
///
/// Exercises are upgraded to the current schema while parsing; a single
/// unreadable record rejects the whole file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedBackup {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub user_profile: Option<UserProfile>,
    #[serde(default)]
    pub weight_unit: Option<WeightUnit>,
    #[serde(default, deserialize_with = "upgraded_exercises")]
    pub exercises: Option<Vec<Exercise>>,
    #[serde(default)]
    pub routines: Option<Vec<Routine>>,
    #[serde(default)]
    pub history: Option<Vec<CompletedWorkout>>,
    #[serde(default)]
    pub metrics: Option<Vec<BodyMetric>>,
    #[serde(default)]
    pub chats: Option<Vec<ChatSession>>,
}

fn upgraded_exercises<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<Exercise>>, D::Error> {
    Option::<Value>::deserialize(deserializer)?
        .map(|raw| upgrade_exercises_strict(raw).map_err(serde::de::Error::custom))
        .transpose()
}

pub fn backup_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Suggested file name, e.g. `titan_fitness_backup_2024-05-01.json`.
pub fn backup_file_name(now: DateTime<Utc>) -> String {
    format!("titan_fitness_backup_{}.json", now.format("%Y-%m-%d"))
}

pub fn write_json<T: Serialize + ?Sized, P: AsRef<Path>>(
    value: &T,
    path: P,
) -> std::io::Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, value).map_err(std::io::Error::other)
}

pub fn write_backup<P: AsRef<Path>>(path: P, backup: &Backup<'_>) -> std::io::Result<()> {
    write_json(backup, path)
}

/// Parse a backup fully before anything is applied.
pub fn parse_backup(data: &str) -> Result<ImportedBackup, ImportError> {
    let backup: ImportedBackup = serde_json::from_str(data)?;
    log::info!(
        "Parsed backup version {} from {}",
        backup.version.as_deref().unwrap_or("?"),
        backup.date.as_deref().unwrap_or("?")
    );
    Ok(backup)
}

pub fn read_backup<P: AsRef<Path>>(path: P) -> Result<ImportedBackup, ImportError> {
    let data = std::fs::read_to_string(path)?;
    parse_backup(&data)
}

pub fn write_csv<T: Serialize>(writer: impl Write, records: &[T]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in records {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(Into::into)
}

/// One logged set of a completed workout, flattened for spreadsheets.
#[derive(Debug, Serialize, PartialEq)]
pub struct SetRow<'a> {
    pub date: String,
    pub program: &'a str,
    pub workout: &'a str,
    pub exercise_id: &'a str,
    pub exercise: &'a str,
    pub set_number: u32,
    pub weight: &'a str,
    pub unit: WeightUnit,
    pub weight_kg: Option<f64>,
    pub reps: &'a str,
    pub rpe: &'a str,
    pub completed: bool,
}

pub fn set_rows<'a>(history: &'a [CompletedWorkout], exercises: &'a [Exercise]) -> Vec<SetRow<'a>> {
    let mut rows = Vec::new();
    for w in history {
        let date = DateTime::from_timestamp_millis(w.date)
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        for log in &w.details {
            let name = exercises
                .iter()
                .find(|e| e.id == log.exercise_id)
                .map(|e| e.name.as_str())
                .unwrap_or("");
            for s in &log.sets {
                rows.push(SetRow {
                    date: date.clone(),
                    program: &w.program_name,
                    workout: &w.sub_routine_name,
                    exercise_id: &log.exercise_id,
                    exercise: name,
                    set_number: s.set_number,
                    weight: &s.weight,
                    unit: s.unit,
                    weight_kg: parse_weight_kg(&s.weight, s.unit),
                    reps: &s.reps,
                    rpe: s.rpe.as_deref().unwrap_or(""),
                    completed: s.completed,
                });
            }
        }
    }
    rows
}

pub fn save_sets_csv<P: AsRef<Path>>(
    path: P,
    history: &[CompletedWorkout],
    exercises: &[Exercise],
) -> csv::Result<()> {
    write_csv(std::fs::File::create(path)?, &set_rows(history, exercises))
}
