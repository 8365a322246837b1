//! Write-through persistence over a local store and an optional remote one.
//!
//! Local writes always happen first. Remote failures are logged and dropped,
//! leaving the local copy as the durable one. Loads prefer the remote store
//! and fall back to local data on any remote error.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::catalog;
use crate::migrate::upgrade_exercises;
use crate::model::{
    ActiveWorkoutSession, BodyMetric, ChatSession, CompletedWorkout, Exercise, Millis, Routine,
    Theme, UserProfile,
};
use crate::store::{DataKey, Snapshot, Store};
use crate::units::WeightUnit;

/// Where the loaded state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Local,
    Remote,
    /// The remote load failed and local data was used instead.
    LocalFallback,
}

/// Fully decoded state, with defaults filled in for absent keys.
#[derive(Debug, Clone)]
pub struct LoadedState {
    pub source: LoadSource,
    pub exercises: Vec<Exercise>,
    pub routines: Vec<Routine>,
    pub history: Vec<CompletedWorkout>,
    pub metrics: Vec<BodyMetric>,
    pub chats: Vec<ChatSession>,
    pub unit: WeightUnit,
    /// `None` until the user has completed onboarding.
    pub profile: Option<UserProfile>,
    pub session: Option<ActiveWorkoutSession>,
    pub theme: Theme,
}

fn decode<T: DeserializeOwned>(snapshot: &mut Snapshot, key: DataKey) -> Option<T> {
    let value = snapshot.remove(&key)?;
    match serde_json::from_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("Ignoring stored {key}: {e}");
            None
        }
    }
}

/// Decode a snapshot, migrating exercises and merging the built-in catalog.
pub fn decode_snapshot(
    mut snapshot: Snapshot,
    theme: Theme,
    source: LoadSource,
    now: Millis,
) -> LoadedState {
    let exercises = match snapshot.remove(&DataKey::Exercises) {
        Some(raw) => catalog::merge_with_defaults(upgrade_exercises(raw)),
        None => catalog::default_exercises(),
    };
    LoadedState {
        source,
        exercises,
        routines: decode(&mut snapshot, DataKey::Routines)
            .unwrap_or_else(|| catalog::default_routines(now)),
        history: decode(&mut snapshot, DataKey::History).unwrap_or_default(),
        metrics: decode(&mut snapshot, DataKey::Metrics).unwrap_or_default(),
        chats: decode(&mut snapshot, DataKey::Chats).unwrap_or_default(),
        unit: decode(&mut snapshot, DataKey::Unit).unwrap_or_default(),
        profile: decode(&mut snapshot, DataKey::Profile),
        session: decode(&mut snapshot, DataKey::ActiveSession),
        theme,
    }
}

pub struct Persistence {
    local: Box<dyn Store>,
    remote: Option<Box<dyn Store>>,
}

impl Persistence {
    pub fn new(local: Box<dyn Store>, remote: Option<Box<dyn Store>>) -> Self {
        Self { local, remote }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Load state, preferring the remote store when one is configured.
    pub fn load(&self, now: Millis) -> LoadedState {
        let mut local = match self.local.load() {
            Ok(s) => s,
            Err(e) => {
                log::error!("Error loading local data: {e}");
                Snapshot::new()
            }
        };
        let theme: Theme = decode(&mut local, DataKey::Theme).unwrap_or_default();

        let Some(remote) = &self.remote else {
            return decode_snapshot(local, theme, LoadSource::Local, now);
        };
        match remote.load() {
            Ok(snapshot) => {
                log::info!("Loaded {} documents from {} store", snapshot.len(), remote.name());
                decode_snapshot(snapshot, theme, LoadSource::Remote, now)
            }
            Err(e) => {
                log::error!("Error fetching remote data (falling back to local): {e}");
                decode_snapshot(local, theme, LoadSource::LocalFallback, now)
            }
        }
    }

    /// Best-effort write of one document to every store.
    pub fn write<T: Serialize + ?Sized>(&self, key: DataKey, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                log::error!("Could not serialize {key}: {e}");
                return;
            }
        };
        self.write_value(key, &value);
    }

    fn write_value(&self, key: DataKey, value: &Value) {
        if let Err(e) = self.local.save(key, value) {
            log::error!("Error saving {key} to {} store: {e}", self.local.name());
        }
        if !key.is_synced() {
            return;
        }
        if let Some(remote) = &self.remote {
            if let Err(e) = remote.save(key, value) {
                log::error!("Error saving {key} to {} store: {e}", remote.name());
            }
        }
    }

    /// Best-effort removal of one document from every store.
    pub fn forget(&self, key: DataKey) {
        if let Err(e) = self.local.remove(key) {
            log::error!("Error removing {key} from {} store: {e}", self.local.name());
        }
        if let Some(remote) = self.remote.as_ref().filter(|_| key.is_synced()) {
            if let Err(e) = remote.remove(key) {
                log::error!("Error removing {key} from {} store: {e}", remote.name());
            }
        }
    }

    /// Wipe the local store.
    pub fn clear_local(&self) {
        if let Err(e) = self.local.clear() {
            log::error!("Error clearing {} store: {e}", self.local.name());
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::LocalStore;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// In-memory store that can be told to fail, shared with the test body.
    #[derive(Clone, Default)]
    pub(crate) struct MemoryStore {
        pub docs: Rc<RefCell<Snapshot>>,
        pub fail: Rc<RefCell<bool>>,
    }

    impl Store for MemoryStore {
        fn name(&self) -> &'static str {
            "memory"
        }

        fn load(&self) -> Result<Snapshot, StoreError> {
            if *self.fail.borrow() {
                return Err(StoreError::Transport("offline".into()));
            }
            Ok(self.docs.borrow().clone())
        }

        fn save(&self, key: DataKey, value: &Value) -> Result<(), StoreError> {
            if *self.fail.borrow() {
                return Err(StoreError::Transport("offline".into()));
            }
            self.docs.borrow_mut().insert(key, value.clone());
            Ok(())
        }

        fn remove(&self, key: DataKey) -> Result<(), StoreError> {
            if *self.fail.borrow() {
                return Err(StoreError::Transport("offline".into()));
            }
            self.docs.borrow_mut().remove(&key);
            Ok(())
        }
    }

    #[test]
    fn empty_store_loads_defaults() {
        let p = Persistence::new(Box::new(MemoryStore::default()), None);
        let state = p.load(7);
        assert_eq!(state.source, LoadSource::Local);
        assert_eq!(state.exercises.len(), catalog::EXERCISES.len());
        assert_eq!(state.routines, catalog::default_routines(7));
        assert!(state.history.is_empty());
        assert_eq!(state.unit, WeightUnit::Kg);
        assert!(state.profile.is_none());
        assert_eq!(state.theme, Theme::Dark);
    }

    #[test]
    fn stored_exercises_are_migrated_and_merged() {
        let local = MemoryStore::default();
        local.docs.borrow_mut().insert(
            DataKey::Exercises,
            json!([{"id": "mine", "name": "Press Inclinado", "muscleGroup": "Pecho"}]),
        );
        let p = Persistence::new(Box::new(local), None);
        let state = p.load(0);
        assert_eq!(state.exercises[0].id, "mine");
        assert_eq!(state.exercises[0].muscle_groups, vec!["Pecho", "Tríceps", "Hombros"]);
        assert_eq!(state.exercises.len(), catalog::EXERCISES.len() + 1);
    }

    #[test]
    fn remote_failure_falls_back_to_local() {
        let local = MemoryStore::default();
        local.docs.borrow_mut().insert(DataKey::Unit, json!("lbs"));
        let remote = MemoryStore::default();
        remote.docs.borrow_mut().insert(DataKey::Unit, json!("kg"));
        *remote.fail.borrow_mut() = true;

        let p = Persistence::new(Box::new(local), Some(Box::new(remote)));
        let state = p.load(0);
        assert_eq!(state.source, LoadSource::LocalFallback);
        assert_eq!(state.unit, WeightUnit::Lbs);
    }

    #[test]
    fn remote_wins_when_reachable_but_theme_stays_local() {
        let local = MemoryStore::default();
        local.docs.borrow_mut().insert(DataKey::Unit, json!("kg"));
        local.docs.borrow_mut().insert(DataKey::Theme, json!("light"));
        let remote = MemoryStore::default();
        remote.docs.borrow_mut().insert(DataKey::Unit, json!("lbs"));

        let p = Persistence::new(Box::new(local), Some(Box::new(remote)));
        let state = p.load(0);
        assert_eq!(state.source, LoadSource::Remote);
        assert_eq!(state.unit, WeightUnit::Lbs);
        assert_eq!(state.theme, Theme::Light);
    }

    #[test]
    fn writes_go_through_and_survive_remote_errors() {
        let local = MemoryStore::default();
        let remote = MemoryStore::default();
        let p = Persistence::new(Box::new(local.clone()), Some(Box::new(remote.clone())));

        p.write(DataKey::Unit, &WeightUnit::Lbs);
        p.write(DataKey::Theme, &Theme::System);
        assert_eq!(local.docs.borrow()[&DataKey::Unit], json!("lbs"));
        assert_eq!(remote.docs.borrow()[&DataKey::Unit], json!("lbs"));
        assert!(!remote.docs.borrow().contains_key(&DataKey::Theme));

        *remote.fail.borrow_mut() = true;
        p.write(DataKey::Unit, &WeightUnit::Kg);
        assert_eq!(local.docs.borrow()[&DataKey::Unit], json!("kg"));

        *remote.fail.borrow_mut() = false;
        p.forget(DataKey::Unit);
        assert!(!local.docs.borrow().contains_key(&DataKey::Unit));
        assert!(!remote.docs.borrow().contains_key(&DataKey::Unit));
    }

    #[test]
    fn unreadable_documents_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalStore::new(dir.path());
        local.save(DataKey::History, &json!({"not": "a list"})).unwrap();
        local.save(DataKey::Unit, &json!("stone")).unwrap();
        let state = Persistence::new(Box::new(local), None).load(0);
        assert!(state.history.is_empty());
        assert_eq!(state.unit, WeightUnit::Kg);
    }
}
