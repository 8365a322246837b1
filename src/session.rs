//! The active workout session: start, resume, set logging and finish.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::analysis::{SessionSummary, calculate_volume_and_prs};
use crate::error::SessionError;
use crate::model::{
    ActiveWorkoutSession, CompletedWorkout, Exercise, ExerciseLog, Millis, SetLog, SubRoutine,
};
use crate::units::WeightUnit;

/// Sessions older than this are discarded instead of resumed.
pub const MAX_SESSION_AGE_MS: Millis = 12 * 60 * 60 * 1000;

/// Sets per exercise when the target set range cannot be parsed.
pub const DEFAULT_SET_COUNT: usize = 3;

/// Length of the pulse fired when a set is marked completed.
pub const COMPLETION_PULSE: Duration = Duration::from_millis(50);

static LEADING_INT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\+?(\d+)").expect("valid integer regex"));

/// What to do when a workout is started while another one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StartPolicy {
    #[default]
    Reject,
    Replace,
}

/// Best-effort tactile feedback. Returns `false` when the device cannot vibrate.
pub trait Haptics {
    fn pulse(&self, duration: Duration) -> bool;
}

/// Haptics for environments without a vibration motor.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn pulse(&self, _duration: Duration) -> bool {
        false
    }
}

/// A single-field edit of one logged set.
#[derive(Debug, Clone, PartialEq)]
pub enum SetField {
    Weight(String),
    Reps(String),
    Rpe(String),
    Completed(bool),
}

/// Result of inspecting a persisted session at load time.
#[derive(Debug, Clone, PartialEq)]
pub enum Restore {
    Empty,
    /// A session young enough to be offered for resume.
    Pending,
    /// A stale session was dropped; stores must forget it too.
    Expired,
}

/// Lower bound of a `"a-b"` range, using the leading integer of the part
/// before the first dash. Zero counts as unparseable.
pub fn parse_lower_bound(range: &str) -> Option<usize> {
    let head = range.split('-').next().unwrap_or("");
    LEADING_INT
        .captures(head)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<usize>().ok())
        .filter(|n| *n > 0)
}

/// Number of sets to seed for a target range like `"3-4"`.
pub fn target_set_count(sets: &str) -> usize {
    parse_lower_bound(sets).unwrap_or(DEFAULT_SET_COUNT)
}

/// Default reps for a fresh set: the text before the first dash.
fn default_reps(reps: &str) -> String {
    reps.split('-').next().unwrap_or("").trim().to_string()
}

/// Sets from the most recent completed workout that logged `exercise_id`.
///
/// History is append-ordered, so the scan runs from the end.
pub fn last_session_sets<'a>(
    history: &'a [CompletedWorkout],
    exercise_id: &str,
) -> Option<&'a [SetLog]> {
    history
        .iter()
        .rev()
        .find_map(|w| w.log_for(exercise_id))
        .map(|log| log.sets.as_slice())
}

/// Build a new session for `sub_routine`, seeding sets from prior history.
pub fn new_session(
    program_name: &str,
    sub_routine: &SubRoutine,
    history: &[CompletedWorkout],
    unit: WeightUnit,
    now: Millis,
) -> ActiveWorkoutSession {
    let logs = sub_routine
        .exercises
        .iter()
        .map(|rex| {
            let previous = last_session_sets(history, &rex.exercise_id);
            let count = target_set_count(&rex.sets);
            let sets = (0..count)
                .map(|i| {
                    let (weight, reps) = match previous.and_then(|p| p.get(i)) {
                        Some(prev) => (prev.weight.clone(), prev.reps.clone()),
                        None => (String::new(), default_reps(&rex.reps)),
                    };
                    SetLog {
                        set_number: i as u32 + 1,
                        weight,
                        reps,
                        rpe: Some(String::new()),
                        completed: false,
                        unit,
                    }
                })
                .collect();
            ExerciseLog {
                routine_exercise_id: rex.id.clone(),
                exercise_id: rex.exercise_id.clone(),
                sets,
            }
        })
        .collect();

    ActiveWorkoutSession {
        program_name: program_name.to_string(),
        sub_routine: sub_routine.clone(),
        start_time: now,
        logs,
    }
}

pub fn is_stale(session: &ActiveWorkoutSession, now: Millis) -> bool {
    now - session.start_time > MAX_SESSION_AGE_MS
}

/// Workout duration in whole minutes, never less than one.
pub fn duration_minutes(start: Millis, end: Millis) -> i64 {
    let minutes = ((end - start) as f64 / 60_000.0).round() as i64;
    minutes.max(1)
}

/// Owner of the at-most-one active workout.
#[derive(Debug, Default)]
pub struct SessionManager {
    active: Option<ActiveWorkoutSession>,
    policy: StartPolicy,
}

impl SessionManager {
    pub fn new(policy: StartPolicy) -> Self {
        Self {
            active: None,
            policy,
        }
    }

    pub fn active(&self) -> Option<&ActiveWorkoutSession> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn policy(&self) -> StartPolicy {
        self.policy
    }

    /// Start a workout, honoring the single-session policy.
    pub fn start(
        &mut self,
        program_name: &str,
        sub_routine: &SubRoutine,
        history: &[CompletedWorkout],
        unit: WeightUnit,
        now: Millis,
    ) -> Result<&ActiveWorkoutSession, SessionError> {
        if let Some(current) = &self.active {
            match self.policy {
                StartPolicy::Reject => {
                    return Err(SessionError::AlreadyActive(current.sub_routine.name.clone()));
                }
                StartPolicy::Replace => {
                    log::warn!(
                        "Replacing unfinished workout {:?} with {:?}",
                        current.sub_routine.name,
                        sub_routine.name
                    );
                }
            }
        }
        log::info!(
            "Starting workout {:?} from {:?} with {} exercises",
            sub_routine.name,
            program_name,
            sub_routine.exercises.len()
        );
        let session = new_session(program_name, sub_routine, history, unit, now);
        Ok(self.active.insert(session))
    }

    /// Adopt a persisted session unless it is older than twelve hours.
    pub fn restore(&mut self, persisted: Option<ActiveWorkoutSession>, now: Millis) -> Restore {
        match persisted {
            None => Restore::Empty,
            Some(session) if is_stale(&session, now) => {
                log::info!(
                    "Discarding stale workout {:?} started at {}",
                    session.sub_routine.name,
                    session.start_time
                );
                self.active = None;
                Restore::Expired
            }
            Some(session) => {
                self.active = Some(session);
                Restore::Pending
            }
        }
    }

    /// Apply one field edit. Completing a set fires a short haptic pulse.
    pub fn update_set(
        &mut self,
        routine_exercise_id: &str,
        set_index: usize,
        field: SetField,
        unit: WeightUnit,
        haptics: &dyn Haptics,
    ) -> Result<(), SessionError> {
        let session = self.active.as_mut().ok_or(SessionError::NoActiveSession)?;
        let log = session
            .logs
            .iter_mut()
            .find(|l| l.routine_exercise_id == routine_exercise_id)
            .ok_or_else(|| SessionError::UnknownLog(routine_exercise_id.to_string()))?;
        let set = log
            .sets
            .get_mut(set_index)
            .ok_or_else(|| SessionError::UnknownSet {
                log: routine_exercise_id.to_string(),
                index: set_index,
            })?;

        if field == SetField::Completed(true) && !haptics.pulse(COMPLETION_PULSE) {
            log::debug!("Haptic feedback unavailable");
        }
        match field {
            SetField::Weight(w) => set.weight = w,
            SetField::Reps(r) => set.reps = r,
            SetField::Rpe(r) => set.rpe = Some(r),
            SetField::Completed(c) => set.completed = c,
        }
        set.unit = unit;
        Ok(())
    }

    /// Append a set that copies the weight and reps of the last one.
    pub fn add_set(
        &mut self,
        routine_exercise_id: &str,
        unit: WeightUnit,
    ) -> Result<(), SessionError> {
        let log = self.log_mut(routine_exercise_id)?;
        let (weight, reps) = log
            .sets
            .last()
            .map(|s| (s.weight.clone(), s.reps.clone()))
            .unwrap_or_default();
        log.sets.push(SetLog {
            set_number: log.sets.len() as u32 + 1,
            weight,
            reps,
            rpe: Some(String::new()),
            completed: false,
            unit,
        });
        Ok(())
    }

    pub fn remove_last_set(&mut self, routine_exercise_id: &str) -> Result<(), SessionError> {
        let log = self.log_mut(routine_exercise_id)?;
        if log.sets.pop().is_none() {
            return Err(SessionError::UnknownSet {
                log: routine_exercise_id.to_string(),
                index: 0,
            });
        }
        Ok(())
    }

    fn log_mut(&mut self, routine_exercise_id: &str) -> Result<&mut ExerciseLog, SessionError> {
        self.active
            .as_mut()
            .ok_or(SessionError::NoActiveSession)?
            .logs
            .iter_mut()
            .find(|l| l.routine_exercise_id == routine_exercise_id)
            .ok_or_else(|| SessionError::UnknownLog(routine_exercise_id.to_string()))
    }

    /// Volume and PR summary shown before the user confirms finishing.
    pub fn preview(
        &self,
        exercises: &[Exercise],
        history: &[CompletedWorkout],
    ) -> Result<SessionSummary, SessionError> {
        let session = self.active.as_ref().ok_or(SessionError::NoActiveSession)?;
        Ok(calculate_volume_and_prs(session, exercises, history))
    }

    /// End the workout. With `save` the returned record must be appended to
    /// history; without it the session is dropped. Either way the slot is
    /// cleared.
    pub fn finish(
        &mut self,
        save: bool,
        summary: &SessionSummary,
        now: Millis,
    ) -> Result<Option<CompletedWorkout>, SessionError> {
        let session = self.active.take().ok_or(SessionError::NoActiveSession)?;
        if !save {
            log::info!("Discarded workout {:?}", session.sub_routine.name);
            return Ok(None);
        }
        let exercises_completed = session.logs.iter().filter(|l| l.has_completed_set()).count();
        let completed = CompletedWorkout {
            id: format!("cw_{now}"),
            program_name: session.program_name,
            sub_routine_name: session.sub_routine.name,
            date: now,
            duration_minutes: duration_minutes(session.start_time, now),
            exercises_completed,
            total_volume: summary.volume,
            prs: summary.prs.clone(),
            details: session.logs,
        };
        log::info!(
            "Saved workout {} ({} min, volume {:.1} kg, {} PRs)",
            completed.id,
            completed.duration_minutes,
            completed.total_volume,
            completed.prs.len()
        );
        Ok(Some(completed))
    }

    /// Drop the active session without recording anything.
    pub fn discard(&mut self) -> Option<ActiveWorkoutSession> {
        self.active.take()
    }
}
