//! Persisted records.
//!
//! Field names serialize in camelCase so stored documents and backups stay
//! readable by earlier versions of the app.

use crate::units::WeightUnit;
use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub type Millis = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "video")]
    Video,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub muscle_groups: Vec<String>,
    #[serde(default)]
    pub equipment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_rest_seconds: Option<u32>,
    #[serde(default)]
    pub schema_version: u32,
}

impl Exercise {
    pub fn primary_muscle(&self) -> &str {
        self.muscle_groups
            .first()
            .map(String::as_str)
            .unwrap_or(crate::migrate::FALLBACK_MUSCLE_GROUP)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TrainingMode {
    #[default]
    #[serde(rename = "Normal")]
    Standard,
    Dropset,
    #[serde(rename = "Biserie")]
    SuperSet,
    #[serde(rename = "Rest-Pause")]
    RestPause,
    #[serde(rename = "Calentamiento")]
    Warmup,
    #[serde(rename = "AMRAP")]
    Amrap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineExercise {
    pub id: String,
    pub exercise_id: String,
    pub sets: String,
    pub reps: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<TrainingMode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubRoutine {
    pub id: String,
    pub name: String,
    pub exercises: Vec<RoutineExercise>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutineFocus {
    #[serde(rename = "PUSH / PULL / LEGS")]
    Ppl,
    #[serde(rename = "FULL BODY")]
    FullBody,
    #[serde(rename = "TORSO / PIERNA")]
    TorsoLegs,
    #[serde(rename = "CARDIO / ABDOMEN")]
    CardioAbs,
    #[serde(rename = "CARDIO")]
    Cardio,
    #[serde(rename = "ABDOMEN")]
    Abs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Routine {
    pub id: String,
    pub name: String,
    pub focus: RoutineFocus,
    pub sub_routines: Vec<SubRoutine>,
    pub created_at: Millis,
}

impl Routine {
    pub fn sub_routine(&self, id: &str) -> Option<&SubRoutine> {
        self.sub_routines.iter().find(|s| s.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetLog {
    pub set_number: u32,
    pub weight: String,
    pub reps: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpe: Option<String>,
    pub completed: bool,
    pub unit: WeightUnit,
}

impl SetLog {
    /// Weight in kilograms when the set is completed and its weight parses.
    pub fn completed_weight_kg(&self) -> Option<f64> {
        if !self.completed {
            return None;
        }
        crate::units::parse_weight_kg(&self.weight, self.unit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseLog {
    pub routine_exercise_id: String,
    pub exercise_id: String,
    pub sets: Vec<SetLog>,
}

impl ExerciseLog {
    pub fn has_completed_set(&self) -> bool {
        self.sets.iter().any(|s| s.completed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveWorkoutSession {
    pub program_name: String,
    pub sub_routine: SubRoutine,
    pub start_time: Millis,
    pub logs: Vec<ExerciseLog>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedWorkout {
    pub id: String,
    pub program_name: String,
    pub sub_routine_name: String,
    pub date: Millis,
    pub duration_minutes: i64,
    pub exercises_completed: usize,
    pub total_volume: f64,
    #[serde(default)]
    pub prs: Vec<String>,
    #[serde(default)]
    pub details: Vec<ExerciseLog>,
}

impl CompletedWorkout {
    pub fn log_for(&self, exercise_id: &str) -> Option<&ExerciseLog> {
        self.details.iter().find(|d| d.exercise_id == exercise_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyMetric {
    pub id: String,
    pub date: Millis,
    pub weight: f64,
    pub unit: WeightUnit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitnessGoal {
    #[serde(rename = "Hipertrofia")]
    Hypertrophy,
    #[serde(rename = "Fuerza")]
    Strength,
    #[serde(rename = "Resistencia")]
    Endurance,
    #[serde(rename = "Pérdida de Peso")]
    WeightLoss,
    #[serde(rename = "Salud General")]
    GeneralHealth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperienceLevel {
    #[serde(rename = "Principiante")]
    Beginner,
    #[serde(rename = "Intermedio")]
    Intermediate,
    #[serde(rename = "Avanzado")]
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    /// Height in centimeters.
    pub height: f64,
    /// Body weight in kilograms.
    pub weight: f64,
    pub goal: FitnessGoal,
    pub experience_level: ExperienceLevel,
}

impl UserProfile {
    /// Profile used until the user completes onboarding.
    pub fn guest() -> Self {
        Self {
            name: "Invitado".into(),
            age: 25,
            gender: Gender::Male,
            height: 175.0,
            weight: 75.0,
            goal: FitnessGoal::Hypertrophy,
            experience_level: ExperienceLevel::Intermediate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: Millis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub created_at: Millis,
    pub last_message_at: Millis,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
    System,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_log_uses_camel_case_and_lowercase_unit() {
        let set = SetLog {
            set_number: 1,
            weight: "60".into(),
            reps: "8".into(),
            rpe: None,
            completed: true,
            unit: WeightUnit::Lbs,
        };
        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(
            value,
            json!({"setNumber": 1, "weight": "60", "reps": "8", "completed": true, "unit": "lbs"})
        );
    }

    #[test]
    fn completed_weight_kg_requires_completion() {
        let mut set = SetLog {
            set_number: 1,
            weight: "100".into(),
            reps: "5".into(),
            rpe: None,
            completed: false,
            unit: WeightUnit::Lbs,
        };
        assert_eq!(set.completed_weight_kg(), None);
        set.completed = true;
        assert!((set.completed_weight_kg().unwrap() - 45.3592).abs() < 1e-9);
    }

    #[test]
    fn training_mode_keeps_stored_labels() {
        let mode: TrainingMode = serde_json::from_value(json!("Biserie")).unwrap();
        assert_eq!(mode, TrainingMode::SuperSet);
        assert_eq!(serde_json::to_value(TrainingMode::Standard).unwrap(), json!("Normal"));
    }

    #[test]
    fn completed_workout_tolerates_missing_details() {
        let w: CompletedWorkout = serde_json::from_value(json!({
            "id": "cw_1",
            "programName": "PPL",
            "subRoutineName": "Push",
            "date": 0,
            "durationMinutes": 40,
            "exercisesCompleted": 2,
            "totalVolume": 300.0
        }))
        .unwrap();
        assert!(w.details.is_empty());
        assert!(w.prs.is_empty());
    }
}
