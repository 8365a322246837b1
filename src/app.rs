//! Application controller.
//!
//! [`App`] owns every piece of state, exposes read-only projections of it and
//! writes each mutated document through [`Persistence`] right away.

use chrono::{DateTime, Local};
use std::path::Path;

use crate::analysis::{self, BasicStats, DayActivity, SessionSummary};
use crate::catalog;
use crate::coach::{self, CoachClient, CoachContext};
use crate::error::{AppError, ImportError, Result, SessionError};
use crate::export::{self, BACKUP_VERSION, Backup, ImportedBackup};
use crate::metrics;
use crate::migrate::CURRENT_SCHEMA_VERSION;
use crate::model::{
    ActiveWorkoutSession, BodyMetric, ChatSession, CompletedWorkout, Exercise, Millis, Routine,
    Theme, UserProfile,
};
use crate::persistence::{LoadSource, Persistence};
use crate::session::{Haptics, Restore, SessionManager, SetField, StartPolicy};
use crate::store::DataKey;
use crate::units::{WeightUnit, to_kg};

pub const IMPORT_PROMPT: &str = "This will overwrite your current data. Continue?";
pub const RESET_PROMPT: &str = "Delete ALL data and restore defaults?";
pub const RESET_FINAL_PROMPT: &str = "This cannot be undone. Are you absolutely sure?";

/// Source of the current time in milliseconds.
pub trait Clock {
    fn now(&self) -> Millis;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Millis {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Yes/no question put to the user before a destructive action.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

/// External collaborators the controller talks to.
pub struct Services {
    pub clock: Box<dyn Clock>,
    pub haptics: Box<dyn Haptics>,
    pub coach: Box<dyn CoachClient>,
}

pub struct App {
    persistence: Persistence,
    services: Services,
    session: SessionManager,
    pending_resume: bool,
    source: LoadSource,
    exercises: Vec<Exercise>,
    routines: Vec<Routine>,
    history: Vec<CompletedWorkout>,
    metrics: Vec<BodyMetric>,
    chats: Vec<ChatSession>,
    unit: WeightUnit,
    profile: Option<UserProfile>,
    theme: Theme,
}

fn not_found(what: &str, id: &str) -> AppError {
    AppError::NotFound(format!("{what} {id}"))
}

impl App {
    /// Load persisted state and inspect any unfinished workout.
    ///
    /// A stale workout is dropped from every store. A recent one is held
    /// until [`App::resolve_resume`] is called.
    pub fn load(persistence: Persistence, policy: StartPolicy, services: Services) -> Self {
        let now = services.clock.now();
        let state = persistence.load(now);
        let mut session = SessionManager::new(policy);
        let pending_resume = match session.restore(state.session, now) {
            Restore::Pending => true,
            Restore::Expired => {
                persistence.forget(DataKey::ActiveSession);
                false
            }
            Restore::Empty => false,
        };
        log::info!(
            "Loaded {} workouts, {} exercises ({:?})",
            state.history.len(),
            state.exercises.len(),
            state.source
        );
        Self {
            persistence,
            services,
            session,
            pending_resume,
            source: state.source,
            exercises: state.exercises,
            routines: state.routines,
            history: state.history,
            metrics: state.metrics,
            chats: state.chats,
            unit: state.unit,
            profile: state.profile,
            theme: state.theme,
        }
    }

    pub fn load_source(&self) -> LoadSource {
        self.source
    }

    /// Whether writes are mirrored to a remote store.
    pub fn has_remote(&self) -> bool {
        self.persistence.has_remote()
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn routines(&self) -> &[Routine] {
        &self.routines
    }

    pub fn history(&self) -> &[CompletedWorkout] {
        &self.history
    }

    pub fn metrics(&self) -> &[BodyMetric] {
        &self.metrics
    }

    pub fn chats(&self) -> &[ChatSession] {
        &self.chats
    }

    pub fn unit(&self) -> WeightUnit {
        self.unit
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// `None` until onboarding is done.
    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn active_session(&self) -> Option<&ActiveWorkoutSession> {
        self.session.active()
    }

    /// A recent unfinished workout is waiting for a resume decision.
    pub fn has_pending_resume(&self) -> bool {
        self.pending_resume
    }

    pub fn stats(&self) -> BasicStats {
        analysis::compute_stats(&self.history)
    }

    pub fn weekly_consistency(&self) -> Vec<DayActivity> {
        match DateTime::from_timestamp_millis(self.services.clock.now()) {
            Some(now) => analysis::weekly_consistency(&self.history, &now.with_timezone(&Local)),
            None => Vec::new(),
        }
    }

    pub fn top_muscle_groups(&self, limit: usize) -> Vec<(String, f64)> {
        let volumes = analysis::muscle_group_volume(&self.history, &self.exercises);
        analysis::top_muscle_groups(&volumes, limit)
    }

    // Workout session

    /// Keep or drop the unfinished workout found at load time.
    pub fn resolve_resume(&mut self, resume: bool) {
        if !self.pending_resume {
            return;
        }
        self.pending_resume = false;
        if !resume {
            self.session.discard();
            self.persistence.forget(DataKey::ActiveSession);
        }
    }

    pub fn start_workout(&mut self, routine_id: &str, sub_routine_id: &str) -> Result<()> {
        let routine = self
            .routines
            .iter()
            .find(|r| r.id == routine_id)
            .ok_or_else(|| SessionError::UnknownRoutine(routine_id.to_string()))?;
        let sub = routine.sub_routine(sub_routine_id).ok_or_else(|| {
            SessionError::UnknownSubRoutine {
                routine: routine_id.to_string(),
                sub_routine: sub_routine_id.to_string(),
            }
        })?;
        let now = self.services.clock.now();
        let session = self
            .session
            .start(&routine.name, sub, &self.history, self.unit, now)?;
        self.pending_resume = false;
        self.persistence.write(DataKey::ActiveSession, session);
        Ok(())
    }

    fn save_session(&self) {
        if let Some(session) = self.session.active() {
            self.persistence.write(DataKey::ActiveSession, session);
        }
    }

    pub fn update_set(
        &mut self,
        routine_exercise_id: &str,
        set_index: usize,
        field: SetField,
    ) -> Result<()> {
        self.session.update_set(
            routine_exercise_id,
            set_index,
            field,
            self.unit,
            self.services.haptics.as_ref(),
        )?;
        self.save_session();
        Ok(())
    }

    pub fn add_set(&mut self, routine_exercise_id: &str) -> Result<()> {
        self.session.add_set(routine_exercise_id, self.unit)?;
        self.save_session();
        Ok(())
    }

    pub fn remove_last_set(&mut self, routine_exercise_id: &str) -> Result<()> {
        self.session.remove_last_set(routine_exercise_id)?;
        self.save_session();
        Ok(())
    }

    pub fn preview_finish(&self) -> Result<SessionSummary> {
        Ok(self.session.preview(&self.exercises, &self.history)?)
    }

    /// Finish the workout, appending it to history when `save` is set.
    pub fn finish_workout(&mut self, save: bool) -> Result<Option<CompletedWorkout>> {
        let summary = self.session.preview(&self.exercises, &self.history)?;
        let completed = self
            .session
            .finish(save, &summary, self.services.clock.now())?;
        self.persistence.forget(DataKey::ActiveSession);
        if let Some(workout) = &completed {
            self.history.push(workout.clone());
            self.persistence.write(DataKey::History, &self.history);
        }
        Ok(completed)
    }

    // Library and routines

    /// Insert or replace an exercise by id. Blank ids get a fresh one.
    pub fn save_exercise(&mut self, mut exercise: Exercise) -> String {
        if exercise.id.is_empty() {
            exercise.id = format!("ex_{}", self.services.clock.now());
        }
        exercise.schema_version = CURRENT_SCHEMA_VERSION;
        let id = exercise.id.clone();
        if !crate::library::update(&mut self.exercises, exercise.clone()) {
            self.exercises.push(exercise);
        }
        self.persistence.write(DataKey::Exercises, &self.exercises);
        id
    }

    pub fn delete_exercise(&mut self, id: &str) -> Result<()> {
        if !crate::library::remove(&mut self.exercises, id) {
            return Err(not_found("exercise", id));
        }
        self.persistence.write(DataKey::Exercises, &self.exercises);
        Ok(())
    }

    pub fn save_routine(&mut self, mut routine: Routine) -> String {
        let now = self.services.clock.now();
        if routine.id.is_empty() {
            routine.id = format!("rt_{now}");
            routine.created_at = now;
        }
        let id = routine.id.clone();
        match self.routines.iter_mut().find(|r| r.id == routine.id) {
            Some(slot) => *slot = routine,
            None => self.routines.push(routine),
        }
        self.persistence.write(DataKey::Routines, &self.routines);
        id
    }

    pub fn delete_routine(&mut self, id: &str) -> Result<()> {
        let before = self.routines.len();
        self.routines.retain(|r| r.id != id);
        if self.routines.len() == before {
            return Err(not_found("routine", id));
        }
        self.persistence.write(DataKey::Routines, &self.routines);
        Ok(())
    }

    // History

    /// Replace a completed workout, typically after editing its sets.
    pub fn update_workout(&mut self, workout: CompletedWorkout) -> Result<()> {
        let slot = self
            .history
            .iter_mut()
            .find(|w| w.id == workout.id)
            .ok_or_else(|| not_found("workout", &workout.id))?;
        *slot = workout;
        self.persistence.write(DataKey::History, &self.history);
        Ok(())
    }

    pub fn delete_workout(&mut self, id: &str) -> Result<()> {
        let before = self.history.len();
        self.history.retain(|w| w.id != id);
        if self.history.len() == before {
            return Err(not_found("workout", id));
        }
        self.persistence.write(DataKey::History, &self.history);
        Ok(())
    }

    // Body metrics and profile

    /// Record a body weight in the current unit.
    pub fn add_metric(&mut self, weight: f64, note: Option<String>) -> BodyMetric {
        let metric = metrics::new_metric(weight, self.unit, note, self.services.clock.now());
        self.metrics.push(metric.clone());
        self.persistence.write(DataKey::Metrics, &self.metrics);
        metric
    }

    pub fn delete_metric(&mut self, id: &str) -> Result<()> {
        let before = self.metrics.len();
        self.metrics.retain(|m| m.id != id);
        if self.metrics.len() == before {
            return Err(not_found("metric", id));
        }
        self.persistence.write(DataKey::Metrics, &self.metrics);
        Ok(())
    }

    /// Store the first profile and seed the weight history from it.
    pub fn complete_onboarding(&mut self, mut profile: UserProfile, weight: f64) {
        profile.weight = to_kg(weight, self.unit);
        self.update_profile(profile);
        self.add_metric(weight, Some("Peso inicial".into()));
    }

    pub fn update_profile(&mut self, profile: UserProfile) {
        self.persistence.write(DataKey::Profile, &profile);
        self.profile = Some(profile);
    }

    pub fn set_unit(&mut self, unit: WeightUnit) {
        self.unit = unit;
        self.persistence.write(DataKey::Unit, &unit);
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.persistence.write(DataKey::Theme, &theme);
    }

    // Backup

    pub fn backup(&self) -> Backup<'_> {
        Backup {
            version: BACKUP_VERSION,
            date: export::backup_timestamp(self.now_utc()),
            user_profile: self.profile.as_ref(),
            weight_unit: self.unit,
            exercises: &self.exercises,
            routines: &self.routines,
            history: &self.history,
            metrics: &self.metrics,
            chats: &self.chats,
        }
    }

    fn now_utc(&self) -> DateTime<chrono::Utc> {
        DateTime::from_timestamp_millis(self.services.clock.now()).unwrap_or_default()
    }

    /// Default backup file name for the current date.
    pub fn backup_file_name(&self) -> String {
        export::backup_file_name(self.now_utc())
    }

    pub fn export_backup(&self, path: &Path) -> Result<()> {
        export::write_backup(path, &self.backup())?;
        log::info!("Exported backup to {}", path.display());
        Ok(())
    }

    pub fn export_sets_csv(&self, path: &Path) -> Result<()> {
        export::save_sets_csv(path, &self.history, &self.exercises)?;
        Ok(())
    }

    /// Read a backup and, after one confirmation, overwrite every field it
    /// contains. Nothing is applied when the file is unreadable.
    pub fn import_backup(&mut self, path: &Path, confirm: &dyn Confirm) -> Result<()> {
        let backup = export::read_backup(path)?;
        if !confirm.confirm(IMPORT_PROMPT) {
            return Err(ImportError::Cancelled.into());
        }
        self.apply_backup(backup);
        Ok(())
    }

    fn apply_backup(&mut self, backup: ImportedBackup) {
        if let Some(profile) = backup.user_profile {
            self.update_profile(profile);
        }
        if let Some(unit) = backup.weight_unit {
            self.set_unit(unit);
        }
        if let Some(exercises) = backup.exercises {
            self.exercises = catalog::merge_with_defaults(exercises);
            self.persistence.write(DataKey::Exercises, &self.exercises);
        }
        if let Some(routines) = backup.routines {
            self.routines = routines;
            self.persistence.write(DataKey::Routines, &self.routines);
        }
        if let Some(history) = backup.history {
            self.history = history;
            self.persistence.write(DataKey::History, &self.history);
        }
        if let Some(metrics) = backup.metrics {
            self.metrics = metrics;
            self.persistence.write(DataKey::Metrics, &self.metrics);
        }
        if let Some(chats) = backup.chats {
            self.chats = chats;
            self.persistence.write(DataKey::Chats, &self.chats);
        }
        log::info!("Imported backup ({} workouts)", self.history.len());
    }

    /// Wipe everything back to defaults after two confirmations.
    pub fn reset(&mut self, confirm: &dyn Confirm) -> Result<()> {
        if !confirm.confirm(RESET_PROMPT) || !confirm.confirm(RESET_FINAL_PROMPT) {
            return Err(AppError::Cancelled);
        }
        let now = self.services.clock.now();
        self.session.discard();
        self.pending_resume = false;
        self.persistence.clear_local();

        self.exercises = catalog::default_exercises();
        self.routines = catalog::default_routines(now);
        self.history.clear();
        self.metrics.clear();
        self.chats.clear();
        self.unit = WeightUnit::default();
        self.profile = None;
        self.theme = Theme::default();

        self.persistence.write(DataKey::Exercises, &self.exercises);
        self.persistence.write(DataKey::Routines, &self.routines);
        self.persistence.write(DataKey::History, &self.history);
        self.persistence.write(DataKey::Metrics, &self.metrics);
        self.persistence.write(DataKey::Chats, &self.chats);
        self.persistence.write(DataKey::Unit, &self.unit);
        self.persistence.forget(DataKey::Profile);
        self.persistence.forget(DataKey::ActiveSession);
        log::warn!("All data reset to defaults");
        Ok(())
    }

    // Coach

    /// Open a new chat at the top of the list and return its id.
    pub fn new_chat(&mut self) -> String {
        let chat = coach::new_chat(self.profile.as_ref(), self.services.clock.now());
        let id = chat.id.clone();
        self.chats.insert(0, chat);
        self.persistence.write(DataKey::Chats, &self.chats);
        id
    }

    /// Send a message in a chat. Returns `false` for blank input.
    pub fn send_chat_message(&mut self, chat_id: &str, text: &str) -> Result<bool> {
        let now = self.services.clock.now();
        let context = CoachContext {
            profile: self.profile.as_ref(),
            history: &self.history,
            metrics: &self.metrics,
        };
        let chat = self
            .chats
            .iter_mut()
            .find(|c| c.id == chat_id)
            .ok_or_else(|| not_found("chat", chat_id))?;
        let sent = coach::send_message(chat, text, &context, self.services.coach.as_ref(), now);
        if sent {
            self.persistence.write(DataKey::Chats, &self.chats);
        }
        Ok(sent)
    }

    pub fn delete_chat(&mut self, chat_id: &str) -> Result<()> {
        let before = self.chats.len();
        self.chats.retain(|c| c.id != chat_id);
        if self.chats.len() == before {
            return Err(not_found("chat", chat_id));
        }
        self.persistence.write(DataKey::Chats, &self.chats);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoachError;
    use crate::model::ChatMessage;
    use crate::persistence::tests::MemoryStore;
    use crate::session::MAX_SESSION_AGE_MS;
    use serde_json::json;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::Duration;

    const MINUTE: Millis = 60_000;

    #[derive(Clone, Default)]
    struct TestClock(Rc<Cell<Millis>>);

    impl Clock for TestClock {
        fn now(&self) -> Millis {
            self.0.get()
        }
    }

    #[derive(Clone, Default)]
    struct Pulses(Rc<Cell<u32>>);

    impl Haptics for Pulses {
        fn pulse(&self, _duration: Duration) -> bool {
            self.0.set(self.0.get() + 1);
            true
        }
    }

    struct EchoCoach;

    impl CoachClient for EchoCoach {
        fn complete(
            &self,
            _system: &str,
            _history: &[ChatMessage],
            message: &str,
        ) -> std::result::Result<String, CoachError> {
            Ok(format!("eco: {message}"))
        }
    }

    struct Answers(RefCell<Vec<bool>>);

    impl Answers {
        fn new(answers: &[bool]) -> Self {
            Self(RefCell::new(answers.iter().rev().copied().collect()))
        }

        fn exhausted(&self) -> bool {
            self.0.borrow().is_empty()
        }
    }

    impl Confirm for Answers {
        fn confirm(&self, _prompt: &str) -> bool {
            self.0.borrow_mut().pop().unwrap_or(false)
        }
    }

    struct Harness {
        app: App,
        clock: TestClock,
        pulses: Pulses,
        local: MemoryStore,
        remote: MemoryStore,
    }

    fn harness_with(local: MemoryStore, remote: MemoryStore, now: Millis) -> Harness {
        let clock = TestClock::default();
        clock.0.set(now);
        let pulses = Pulses::default();
        let persistence =
            Persistence::new(Box::new(local.clone()), Some(Box::new(remote.clone())));
        let services = Services {
            clock: Box::new(clock.clone()),
            haptics: Box::new(pulses.clone()),
            coach: Box::new(EchoCoach),
        };
        Harness {
            app: App::load(persistence, StartPolicy::Reject, services),
            clock,
            pulses,
            local,
            remote,
        }
    }

    fn harness() -> Harness {
        harness_with(MemoryStore::default(), MemoryStore::default(), 1_000_000)
    }

    #[test]
    fn full_workout_flow_records_history() {
        let mut h = harness();
        h.app.start_workout("rt_2", "sr_fb_1").unwrap();
        assert!(h.local.docs.borrow().contains_key(&DataKey::ActiveSession));

        h.app
            .update_set("re_fb_1", 0, SetField::Weight("100".into()))
            .unwrap();
        h.app
            .update_set("re_fb_1", 0, SetField::Completed(true))
            .unwrap();
        assert_eq!(h.pulses.0.get(), 1);

        h.clock.0.set(1_000_000 + 45 * MINUTE);
        let summary = h.app.preview_finish().unwrap();
        assert_eq!(summary.volume, 100.0);
        assert_eq!(summary.prs, vec!["Sentadilla Trasera con Barra"]);

        let done = h.app.finish_workout(true).unwrap().unwrap();
        assert_eq!(done.duration_minutes, 45);
        assert_eq!(done.exercises_completed, 1);
        assert!(h.app.active_session().is_none());
        assert_eq!(h.app.history().len(), 1);
        assert!(!h.local.docs.borrow().contains_key(&DataKey::ActiveSession));
        assert_eq!(h.remote.docs.borrow()[&DataKey::History][0]["id"], json!(done.id));
    }

    #[test]
    fn next_session_is_seeded_from_history() {
        let mut h = harness();
        h.app.start_workout("rt_2", "sr_fb_1").unwrap();
        h.app
            .update_set("re_fb_1", 1, SetField::Weight("80".into()))
            .unwrap();
        h.app.finish_workout(true).unwrap();

        h.app.start_workout("rt_2", "sr_fb_1").unwrap();
        let session = h.app.active_session().unwrap();
        assert_eq!(session.logs[0].sets[1].weight, "80");
        assert_eq!(session.logs[0].sets[0].weight, "");
        assert_eq!(session.logs[0].sets[0].reps, "10");
    }

    #[test]
    fn starting_twice_is_rejected() {
        let mut h = harness();
        h.app.start_workout("rt_1", "sr_1").unwrap();
        let err = h.app.start_workout("rt_1", "sr_2").unwrap_err();
        assert!(matches!(
            err,
            AppError::Session(SessionError::AlreadyActive(_))
        ));
        assert!(matches!(
            h.app.start_workout("nope", "sr_1").unwrap_err(),
            AppError::Session(SessionError::UnknownRoutine(_))
        ));
    }

    #[test]
    fn stale_session_is_forgotten_everywhere() {
        let mut h = harness();
        h.app.start_workout("rt_1", "sr_1").unwrap();
        let start = h.clock.0.get();
        let h2 = harness_with(h.local.clone(), h.remote.clone(), start + MAX_SESSION_AGE_MS + 1);
        assert!(!h2.app.has_pending_resume());
        assert!(h2.app.active_session().is_none());
        assert!(!h2.local.docs.borrow().contains_key(&DataKey::ActiveSession));
        assert!(!h2.remote.docs.borrow().contains_key(&DataKey::ActiveSession));
    }

    #[test]
    fn recent_session_waits_for_resume_decision() {
        let mut h = harness();
        h.app.start_workout("rt_1", "sr_1").unwrap();
        let start = h.clock.0.get();

        let mut resumed =
            harness_with(h.local.clone(), h.remote.clone(), start + MAX_SESSION_AGE_MS);
        assert!(resumed.app.has_pending_resume());
        resumed.app.resolve_resume(true);
        assert!(resumed.app.active_session().is_some());

        let mut dropped = harness_with(h.local.clone(), h.remote.clone(), start + MINUTE);
        dropped.app.resolve_resume(false);
        assert!(dropped.app.active_session().is_none());
        assert!(!dropped.local.docs.borrow().contains_key(&DataKey::ActiveSession));
    }

    #[test]
    fn reset_needs_both_confirmations() {
        let mut h = harness();
        h.app.add_metric(80.0, None);
        h.app.set_theme(Theme::Light);

        let once = Answers::new(&[true, false]);
        assert!(matches!(h.app.reset(&once), Err(AppError::Cancelled)));
        assert!(once.exhausted());
        assert_eq!(h.app.metrics().len(), 1);

        let twice = Answers::new(&[true, true]);
        h.app.reset(&twice).unwrap();
        assert!(h.app.metrics().is_empty());
        assert_eq!(h.app.theme(), Theme::Dark);
        assert_eq!(h.app.routines().len(), 2);
        assert_eq!(h.remote.docs.borrow()[&DataKey::Metrics], json!([]));
        assert!(!h.local.docs.borrow().contains_key(&DataKey::Theme));
    }

    #[test]
    fn import_requires_confirmation_and_migrates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        std::fs::write(
            &path,
            json!({
                "version": "1.0",
                "weightUnit": "lbs",
                "exercises": [{"id": "old", "name": "Press Plano", "muscleGroup": "Pecho"}],
                "metrics": [{"id": "bm_1", "date": 1, "weight": 180.0, "unit": "lbs"}]
            })
            .to_string(),
        )
        .unwrap();

        let mut h = harness();
        let refused = h.app.import_backup(&path, &Answers::new(&[false]));
        assert!(matches!(refused, Err(AppError::Import(ImportError::Cancelled))));
        assert_eq!(h.app.unit(), WeightUnit::Kg);

        h.app.import_backup(&path, &Answers::new(&[true])).unwrap();
        assert_eq!(h.app.unit(), WeightUnit::Lbs);
        assert_eq!(h.app.metrics().len(), 1);
        assert_eq!(h.app.exercises()[0].muscle_groups, vec!["Pecho", "Tríceps", "Hombros"]);
        assert_eq!(h.app.exercises().len(), catalog::EXERCISES.len() + 1);
        assert_eq!(h.app.routines().len(), 2);
    }

    #[test]
    fn malformed_import_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"history": 5}"#).unwrap();

        let mut h = harness();
        h.app.add_metric(70.0, None);
        let answers = Answers::new(&[true]);
        let err = h.app.import_backup(&path, &answers).unwrap_err();
        assert!(matches!(err, AppError::Import(ImportError::Malformed(_))));
        assert!(!answers.exhausted());
        assert_eq!(h.app.metrics().len(), 1);
    }

    #[test]
    fn unreadable_exercises_abort_the_whole_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad_exercises.json");
        std::fs::write(&path, r#"{"exercises": 5, "history": []}"#).unwrap();

        let mut h = harness();
        let mut custom = catalog::default_exercises().remove(0);
        custom.id = "custom_1".into();
        h.app.save_exercise(custom);
        h.app.start_workout("rt_2", "sr_fb_1").unwrap();
        h.app.finish_workout(true).unwrap();
        let exercises_before = h.app.exercises().to_vec();

        let answers = Answers::new(&[true]);
        let err = h.app.import_backup(&path, &answers).unwrap_err();
        assert!(matches!(err, AppError::Import(ImportError::Malformed(_))));
        assert!(!answers.exhausted());
        assert_eq!(h.app.exercises(), exercises_before.as_slice());
        assert_eq!(h.app.history().len(), 1);
        assert_eq!(h.local.docs.borrow()[&DataKey::History].as_array().unwrap().len(), 1);
    }

    #[test]
    fn discarding_a_workout_keeps_history() {
        let mut h = harness();
        h.app.start_workout("rt_2", "sr_fb_1").unwrap();
        let saved = h.app.finish_workout(true).unwrap().unwrap();
        let stored_history = h.local.docs.borrow()[&DataKey::History].clone();

        h.clock.0.set(2_000_000);
        h.app.start_workout("rt_1", "sr_1").unwrap();
        h.app
            .update_set("re_1", 0, SetField::Completed(true))
            .unwrap();
        assert!(h.local.docs.borrow().contains_key(&DataKey::ActiveSession));

        assert!(h.app.finish_workout(false).unwrap().is_none());
        assert!(h.app.active_session().is_none());
        assert_eq!(h.app.history(), std::slice::from_ref(&saved));
        assert_eq!(h.local.docs.borrow()[&DataKey::History], stored_history);
        assert_eq!(h.remote.docs.borrow()[&DataKey::History], stored_history);
        assert!(!h.local.docs.borrow().contains_key(&DataKey::ActiveSession));
        assert!(!h.remote.docs.borrow().contains_key(&DataKey::ActiveSession));
    }

    #[test]
    fn export_then_import_restores_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let mut h = harness();
        h.app.add_metric(82.0, Some("mañana".into()));
        h.app.export_backup(&path).unwrap();

        let mut fresh = harness();
        fresh.app.import_backup(&path, &Answers::new(&[true])).unwrap();
        assert_eq!(fresh.app.metrics(), h.app.metrics());
        assert_eq!(fresh.app.exercises(), h.app.exercises());
    }

    #[test]
    fn onboarding_stores_profile_and_first_metric() {
        let mut h = harness();
        h.app.set_unit(WeightUnit::Lbs);
        h.app.complete_onboarding(UserProfile::guest(), 200.0);
        let profile = h.app.profile().unwrap();
        assert!((profile.weight - 90.7184).abs() < 1e-9);
        assert_eq!(h.app.metrics()[0].unit, WeightUnit::Lbs);
        assert_eq!(h.app.metrics()[0].weight, 200.0);
        assert!(h.remote.docs.borrow().contains_key(&DataKey::Profile));
    }

    #[test]
    fn chats_are_created_answered_and_deleted() {
        let mut h = harness();
        let id = h.app.new_chat();
        assert!(h.app.send_chat_message(&id, "hola").unwrap());
        assert!(!h.app.send_chat_message(&id, "  ").unwrap());
        let chat = &h.app.chats()[0];
        assert_eq!(chat.title, "hola");
        assert_eq!(chat.messages.last().unwrap().text, "eco: hola");
        assert!(matches!(
            h.app.send_chat_message("missing", "x"),
            Err(AppError::NotFound(_))
        ));
        h.app.delete_chat(&id).unwrap();
        assert!(h.app.chats().is_empty());
        assert_eq!(h.local.docs.borrow()[&DataKey::Chats], json!([]));
    }

    #[test]
    fn workouts_can_be_edited_and_deleted() {
        let mut h = harness();
        h.app.start_workout("rt_2", "sr_fb_1").unwrap();
        let mut done = h.app.finish_workout(true).unwrap().unwrap();
        done.details[0].sets[0].weight = "90".into();
        h.app.update_workout(done.clone()).unwrap();
        assert_eq!(h.app.history()[0].details[0].sets[0].weight, "90");

        h.app.delete_workout(&done.id).unwrap();
        assert!(h.app.history().is_empty());
        assert!(matches!(h.app.delete_workout(&done.id), Err(AppError::NotFound(_))));
    }

    #[test]
    fn custom_exercises_get_ids_and_current_schema() {
        let mut h = harness();
        let mut ex = catalog::default_exercises().remove(0);
        ex.id = String::new();
        ex.name = "Remo Pendlay".into();
        ex.schema_version = 0;
        let id = h.app.save_exercise(ex);
        assert_eq!(id, "ex_1000000");
        let saved = h.app.exercises().iter().find(|e| e.id == id).unwrap();
        assert_eq!(saved.schema_version, CURRENT_SCHEMA_VERSION);
        h.app.delete_exercise(&id).unwrap();
        assert!(h.app.delete_exercise(&id).is_err());
    }

    #[test]
    fn theme_stays_local() {
        let mut h = harness();
        h.app.set_theme(Theme::System);
        assert_eq!(h.local.docs.borrow()[&DataKey::Theme], json!("system"));
        assert!(!h.remote.docs.borrow().contains_key(&DataKey::Theme));
        assert!(h.app.has_remote());
    }
}
