//! Core of the TitanFit workout tracker: exercise library, routines, the
//! active workout session, history analytics, body metrics, AI coach chats
//! and write-through persistence to local and remote stores.

pub mod analysis;
pub mod app;
pub mod catalog;
pub mod coach;
pub mod config;
pub mod error;
pub mod export;
pub mod library;
pub mod metrics;
pub mod migrate;
pub mod model;
pub mod persistence;
pub mod plates;
pub mod session;
pub mod store;
pub mod sync;
pub mod units;

pub use app::{App, Clock, Confirm, Services, SystemClock};
pub use config::Settings;
pub use error::{AppError, Result};
pub use units::WeightUnit;

#[cfg(test)]
pub(crate) mod test_support {
    use once_cell::sync::Lazy;
    use std::sync::Mutex;

    /// Serializes tests that touch process environment variables.
    pub static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
}
