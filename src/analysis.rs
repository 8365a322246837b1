// Module for analyzing workout data
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::model::{ActiveWorkoutSession, CompletedWorkout, Exercise, ExerciseLog, Millis, SetLog};
use crate::units::parse_weight;

/// Volume and new personal records of a session about to be finished.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Sum of completed set weights in kilograms.
    pub volume: f64,
    /// Names of exercises whose best weight beat every earlier workout.
    pub prs: Vec<String>,
}

/// Summary statistics about the workout history.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicStats {
    pub total_workouts: usize,
    pub total_volume: f64,
    pub total_prs: usize,
    pub avg_duration_minutes: f64,
    pub avg_days_between: f64,
    pub most_common_routine: Option<String>,
}

/// Available formulas for estimating a one-rep max.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OneRmFormula {
    /// Epley formula: `weight * (1 + reps / 30)`.
    #[default]
    Epley,
    /// Brzycki formula: `weight * 36 / (37 - reps)`.
    Brzycki,
}

impl OneRmFormula {
    pub fn estimate(self, weight: f64, reps: f64) -> Option<f64> {
        match self {
            OneRmFormula::Epley => Some(weight * (1.0 + reps / 30.0)),
            OneRmFormula::Brzycki if reps >= 37.0 => None,
            OneRmFormula::Brzycki => Some(weight * 36.0 / (37.0 - reps)),
        }
    }
}

/// Best estimated max of one workout for a single exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressPoint {
    pub date: Millis,
    pub program_name: String,
    pub best_est_1rm: f64,
    pub best_weight: f64,
    pub sets: Vec<SetLog>,
}

/// Whether any workout was completed on a given calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayActivity {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub has_workout: bool,
}

/// Kilogram weights of the completed sets whose weight parses.
fn completed_weights_kg(sets: &[SetLog]) -> impl Iterator<Item = f64> + '_ {
    sets.iter().filter_map(SetLog::completed_weight_kg)
}

fn max_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.fold(None, |best, v| match best {
        Some(b) if b >= v => Some(b),
        _ => Some(v),
    })
}

/// Heaviest completed set, in kilograms, ever logged for `exercise_id`.
///
/// Returns 0 when the exercise has no completed history.
pub fn historical_max_kg(history: &[CompletedWorkout], exercise_id: &str) -> f64 {
    history
        .iter()
        .filter_map(|w| w.log_for(exercise_id))
        .filter_map(|log| max_of(completed_weights_kg(&log.sets)))
        .fold(0.0, f64::max)
}

/// Compute the session volume and the exercises that set a new record.
///
/// Logs whose exercise is not in the library are skipped, as are logs
/// without a completed set carrying a numeric weight. Volume sums one weight
/// per set, the same measure used for the record comparison.
pub fn calculate_volume_and_prs(
    session: &ActiveWorkoutSession,
    exercises: &[Exercise],
    history: &[CompletedWorkout],
) -> SessionSummary {
    let mut summary = SessionSummary::default();

    for log in &session.logs {
        let Some(exercise) = exercises.iter().find(|e| e.id == log.exercise_id) else {
            log::debug!("Skipping log for unknown exercise {}", log.exercise_id);
            continue;
        };
        let weights: Vec<f64> = completed_weights_kg(&log.sets).collect();
        let Some(current_max) = max_of(weights.iter().copied()) else {
            continue;
        };
        summary.volume += weights.iter().sum::<f64>();

        let previous_max = historical_max_kg(history, &log.exercise_id);
        if current_max > previous_max && current_max > 0.0 {
            summary.prs.push(exercise.name.clone());
        }
    }

    summary
}

/// Volume of one exercise log in kilograms.
pub fn log_volume_kg(log: &ExerciseLog) -> f64 {
    completed_weights_kg(&log.sets).sum()
}

/// All-time volume per primary muscle group, in kilograms.
pub fn muscle_group_volume(
    history: &[CompletedWorkout],
    exercises: &[Exercise],
) -> HashMap<String, f64> {
    let mut map: HashMap<String, f64> = HashMap::new();
    for workout in history {
        for log in &workout.details {
            if let Some(ex) = exercises.iter().find(|e| e.id == log.exercise_id) {
                *map.entry(ex.primary_muscle().to_string()).or_insert(0.0) += log_volume_kg(log);
            }
        }
    }
    map
}

/// Muscle groups sorted by volume, largest first, limited to `limit`.
pub fn top_muscle_groups(volumes: &HashMap<String, f64>, limit: usize) -> Vec<(String, f64)> {
    let mut entries: Vec<(String, f64)> = volumes.iter().map(|(k, v)| (k.clone(), *v)).collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(limit);
    entries
}

fn workout_date<Tz: TimeZone>(ms: Millis, tz: &Tz) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(ms).map(|utc| utc.with_timezone(tz).date_naive())
}

/// The seven days ending on `now`, oldest first.
pub fn weekly_consistency<Tz: TimeZone>(
    history: &[CompletedWorkout],
    now: &DateTime<Tz>,
) -> Vec<DayActivity> {
    let tz = now.timezone();
    let today = now.date_naive();
    let dates: Vec<NaiveDate> = history
        .iter()
        .filter_map(|w| workout_date(w.date, &tz))
        .collect();
    (0..7)
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            DayActivity {
                date,
                weekday: date.weekday(),
                has_workout: dates.contains(&date),
            }
        })
        .collect()
}

/// Per-workout best estimated max for one exercise, oldest first.
pub fn exercise_progress(
    history: &[CompletedWorkout],
    exercise_id: &str,
    formula: OneRmFormula,
) -> Vec<ProgressPoint> {
    let mut points: Vec<ProgressPoint> = history
        .iter()
        .filter_map(|w| {
            let log = w.log_for(exercise_id)?;
            let sets: Vec<SetLog> = log.sets.iter().filter(|s| s.completed).cloned().collect();
            if sets.is_empty() {
                return None;
            }
            let mut best_est_1rm = 0.0_f64;
            let mut best_weight = 0.0_f64;
            for s in &sets {
                let (Some(w), Some(r)) = (s.completed_weight_kg(), parse_weight(&s.reps)) else {
                    continue;
                };
                best_weight = best_weight.max(w);
                if let Some(est) = formula.estimate(w, r) {
                    best_est_1rm = best_est_1rm.max(est);
                }
            }
            Some(ProgressPoint {
                date: w.date,
                program_name: w.program_name.clone(),
                best_est_1rm,
                best_weight,
                sets,
            })
        })
        .collect();
    points.sort_by_key(|p| p.date);
    points
}

/// Compute overall statistics for the workout history.
pub fn compute_stats(history: &[CompletedWorkout]) -> BasicStats {
    if history.is_empty() {
        return BasicStats::default();
    }

    log::info!("Computing statistics for {} workouts", history.len());

    let total_workouts = history.len();
    let total_volume: f64 = history.iter().map(|w| w.total_volume).sum();
    let total_prs: usize = history.iter().map(|w| w.prs.len()).sum();
    let avg_duration_minutes =
        history.iter().map(|w| w.duration_minutes as f64).sum::<f64>() / total_workouts as f64;

    let mut dates: Vec<NaiveDate> = history
        .iter()
        .filter_map(|w| workout_date(w.date, &chrono::Utc))
        .collect();
    dates.sort();
    dates.dedup();
    let mut total_gap_days = 0i64;
    for w in dates.windows(2) {
        if let [a, b] = w {
            total_gap_days += (*b - *a).num_days();
        }
    }
    let avg_days_between = if dates.len() > 1 {
        total_gap_days as f64 / (dates.len() as f64 - 1.0)
    } else {
        0.0
    };

    let mut routine_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for w in history {
        *routine_counts.entry(w.sub_routine_name.as_str()).or_insert(0) += 1;
    }
    let most_common_routine = routine_counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(name, _)| name.to_string());

    BasicStats {
        total_workouts,
        total_volume,
        total_prs,
        avg_duration_minutes,
        avg_days_between,
        most_common_routine,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SubRoutine;
    use crate::units::WeightUnit;
    use chrono::Utc;

    const DAY: Millis = 24 * 60 * 60 * 1000;

    fn exercise(id: &str, name: &str, group: &str) -> Exercise {
        Exercise {
            id: id.into(),
            name: name.into(),
            muscle_groups: vec![group.into()],
            equipment: "Barra".into(),
            pattern: None,
            subtype: None,
            description: None,
            media_url: None,
            media_type: None,
            default_rest_seconds: None,
            schema_version: 1,
        }
    }

    fn set(weight: &str, reps: &str, unit: WeightUnit, completed: bool) -> SetLog {
        SetLog {
            set_number: 1,
            weight: weight.into(),
            reps: reps.into(),
            rpe: None,
            completed,
            unit,
        }
    }

    fn log(exercise_id: &str, sets: Vec<SetLog>) -> ExerciseLog {
        ExerciseLog {
            routine_exercise_id: format!("re_{exercise_id}"),
            exercise_id: exercise_id.into(),
            sets,
        }
    }

    fn workout(date: Millis, name: &str, details: Vec<ExerciseLog>) -> CompletedWorkout {
        CompletedWorkout {
            id: format!("cw_{date}"),
            program_name: "PPL".into(),
            sub_routine_name: name.into(),
            date,
            duration_minutes: 60,
            exercises_completed: details.len(),
            total_volume: details.iter().map(log_volume_kg).sum(),
            prs: vec![],
            details,
        }
    }

    fn session(logs: Vec<ExerciseLog>) -> ActiveWorkoutSession {
        ActiveWorkoutSession {
            program_name: "PPL".into(),
            sub_routine: SubRoutine {
                id: "sr".into(),
                name: "Legs".into(),
                exercises: vec![],
            },
            start_time: 0,
            logs,
        }
    }

    #[test]
    fn volume_counts_only_completed_sets() {
        let s = session(vec![log(
            "sq",
            vec![
                set("100", "5", WeightUnit::Kg, true),
                set("100", "5", WeightUnit::Kg, false),
            ],
        )]);
        let summary = calculate_volume_and_prs(&s, &[exercise("sq", "Squat", "Legs")], &[]);
        assert!((summary.volume - 100.0).abs() < 1e-9);
    }

    #[test]
    fn squat_pr_scenario() {
        let history = vec![workout(
            0,
            "Legs",
            vec![log("sq", vec![set("100", "5", WeightUnit::Kg, true)])],
        )];
        let s = session(vec![log("sq", vec![set("120", "3", WeightUnit::Kg, true)])]);
        let summary = calculate_volume_and_prs(&s, &[exercise("sq", "Squat", "Legs")], &history);
        assert_eq!(summary.prs, vec!["Squat".to_string()]);
        assert!((summary.volume - 120.0).abs() < 1e-9);
    }

    #[test]
    fn equal_or_lower_weights_are_not_records() {
        let history = vec![workout(
            0,
            "Legs",
            vec![log("sq", vec![set("100", "5", WeightUnit::Kg, true)])],
        )];
        let exercises = [exercise("sq", "Squat", "Legs")];
        for w in ["100", "95"] {
            let s = session(vec![log("sq", vec![set(w, "5", WeightUnit::Kg, true)])]);
            assert!(calculate_volume_and_prs(&s, &exercises, &history).prs.is_empty());
        }
    }

    #[test]
    fn records_compare_in_kilograms() {
        // 100 kg in history; 225 lbs is about 102 kg.
        let history = vec![workout(
            0,
            "Legs",
            vec![log("sq", vec![set("100", "5", WeightUnit::Kg, true)])],
        )];
        let exercises = [exercise("sq", "Squat", "Legs")];
        let heavier = session(vec![log("sq", vec![set("225", "5", WeightUnit::Lbs, true)])]);
        let summary = calculate_volume_and_prs(&heavier, &exercises, &history);
        assert_eq!(summary.prs.len(), 1);
        assert!((summary.volume - 225.0 * 0.453592).abs() < 1e-9);

        let lighter = session(vec![log("sq", vec![set("220", "5", WeightUnit::Lbs, true)])]);
        assert!(calculate_volume_and_prs(&lighter, &exercises, &history).prs.is_empty());
    }

    #[test]
    fn zero_weight_and_unknown_exercises_are_ignored() {
        let exercises = [exercise("pu", "Push-up", "Chest")];
        let s = session(vec![
            log("pu", vec![set("0", "20", WeightUnit::Kg, true)]),
            log("ghost", vec![set("50", "5", WeightUnit::Kg, true)]),
            log("pu", vec![set("abc", "5", WeightUnit::Kg, true)]),
        ]);
        let summary = calculate_volume_and_prs(&s, &exercises, &[]);
        assert!(summary.prs.is_empty());
        assert_eq!(summary.volume, 0.0);
    }

    #[test]
    fn historical_max_skips_incomplete_and_unparseable_sets() {
        let history = vec![
            workout(
                0,
                "A",
                vec![log(
                    "sq",
                    vec![
                        set("140", "1", WeightUnit::Kg, false),
                        set("90", "5", WeightUnit::Kg, true),
                    ],
                )],
            ),
            workout(
                DAY,
                "B",
                vec![log(
                    "sq",
                    vec![
                        set("", "5", WeightUnit::Kg, true),
                        set("110", "3", WeightUnit::Kg, true),
                    ],
                )],
            ),
        ];
        assert!((historical_max_kg(&history, "sq") - 110.0).abs() < 1e-9);
        assert_eq!(historical_max_kg(&history, "bench"), 0.0);
    }

    #[test]
    fn muscle_volume_uses_primary_group() {
        let exercises = [exercise("sq", "Squat", "Legs"), exercise("bp", "Bench", "Chest")];
        let history = vec![
            workout(
                0,
                "A",
                vec![
                    log("sq", vec![set("100", "5", WeightUnit::Kg, true)]),
                    log("bp", vec![set("60", "5", WeightUnit::Kg, true)]),
                ],
            ),
            workout(
                DAY,
                "B",
                vec![log("sq", vec![set("220.462", "5", WeightUnit::Lbs, true)])],
            ),
        ];
        let vol = muscle_group_volume(&history, &exercises);
        assert!((vol["Legs"] - 200.0).abs() < 1e-3);
        assert!((vol["Chest"] - 60.0).abs() < 1e-9);
        let top = top_muscle_groups(&vol, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].0, "Legs");
    }

    #[test]
    fn weekly_consistency_marks_workout_days() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 18, 0, 0).unwrap();
        let two_days_ago = (now - Duration::days(2)).timestamp_millis();
        let old = (now - Duration::days(9)).timestamp_millis();
        let history = vec![workout(two_days_ago, "A", vec![]), workout(old, "B", vec![])];
        let week = weekly_consistency(&history, &now);
        assert_eq!(week.len(), 7);
        assert_eq!(week[6].date, now.date_naive());
        assert_eq!(week[6].weekday, Weekday::Sun);
        let active: Vec<bool> = week.iter().map(|d| d.has_workout).collect();
        assert_eq!(active, vec![false, false, false, false, true, false, false]);
    }

    #[test]
    fn progress_uses_epley_on_kilograms() {
        let history = vec![
            workout(
                DAY,
                "B",
                vec![log(
                    "sq",
                    vec![
                        set("100", "5", WeightUnit::Kg, true),
                        set("120", "1", WeightUnit::Kg, false),
                    ],
                )],
            ),
            workout(0, "A", vec![log("sq", vec![set("200", "3", WeightUnit::Lbs, true)])]),
        ];
        let points = exercise_progress(&history, "sq", OneRmFormula::Epley);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, 0);
        assert!((points[0].best_est_1rm - 200.0 * 0.453592 * 1.1).abs() < 1e-6);
        assert!((points[1].best_est_1rm - 100.0 * (1.0 + 5.0 / 30.0)).abs() < 1e-6);
        assert_eq!(points[1].sets.len(), 1);
    }

    #[test]
    fn brzycki_rejects_high_rep_sets() {
        assert_eq!(OneRmFormula::Brzycki.estimate(100.0, 37.0), None);
        assert!((OneRmFormula::Brzycki.estimate(100.0, 1.0).unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_compute_stats() {
        let history = vec![
            workout(0, "Push", vec![log("bp", vec![set("60", "5", WeightUnit::Kg, true)])]),
            workout(2 * DAY, "Pull", vec![log("row", vec![set("50", "5", WeightUnit::Kg, true)])]),
            workout(4 * DAY, "Push", vec![log("bp", vec![set("65", "5", WeightUnit::Kg, true)])]),
        ];
        let stats = compute_stats(&history);
        assert_eq!(stats.total_workouts, 3);
        assert!((stats.total_volume - 175.0).abs() < 1e-9);
        assert!((stats.avg_days_between - 2.0).abs() < 1e-9);
        assert!((stats.avg_duration_minutes - 60.0).abs() < 1e-9);
        assert_eq!(stats.most_common_routine.as_deref(), Some("Push"));
    }

    #[test]
    fn test_empty_history_stats() {
        assert_eq!(compute_stats(&[]), BasicStats::default());
    }
}
