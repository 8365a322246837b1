use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

use crate::error::StoreError;
use crate::store::{DataKey, Snapshot, Store};

/// Remote reads and writes give up after this long.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Determine the token to use for remote requests.
///
/// If the `TITAN_REMOTE_TOKEN` environment variable is set, its value takes
/// precedence over any token provided in the application settings.
pub fn resolve_token(settings_token: Option<&str>) -> Option<String> {
    std::env::var("TITAN_REMOTE_TOKEN")
        .ok()
        .or_else(|| settings_token.map(|s| s.to_string()))
}

#[derive(Debug, Deserialize)]
struct Row {
    key: String,
    value: Value,
}

/// Per-user document store reached over HTTP.
///
/// Documents live under `{base}/users/{user_id}/data/{key}`. Listing the
/// collection returns `[{"key": ..., "value": ...}]` rows.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    agent: ureq::Agent,
    base_url: String,
    user_id: String,
    token: Option<String>,
}

impl RemoteStore {
    pub fn new(base_url: &str, user_id: &str, token: Option<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id: user_id.to_string(),
            token,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn collection_url(&self) -> String {
        format!("{}/users/{}/data", self.base_url, self.user_id)
    }

    fn document_url(&self, key: DataKey) -> String {
        format!("{}/{}", self.collection_url(), key.as_str())
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        let req = self
            .agent
            .request(method, url)
            .set("Accept", "application/json");
        match &self.token {
            Some(t) => req.set("Authorization", &format!("Bearer {t}")),
            None => req,
        }
    }
}

fn map_error(err: ureq::Error) -> StoreError {
    match err {
        ureq::Error::Status(401, r) => {
            StoreError::Unauthorized(r.into_string().unwrap_or_default())
        }
        ureq::Error::Status(403, r) => StoreError::Forbidden(r.into_string().unwrap_or_default()),
        ureq::Error::Status(status, r) => StoreError::Status {
            status,
            body: r.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(t) => StoreError::Transport(t.to_string()),
    }
}

impl Store for RemoteStore {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn load(&self) -> Result<Snapshot, StoreError> {
        let url = self.collection_url();
        log::info!("Fetching remote data for user {}", self.user_id);
        let rows: Vec<Row> = self
            .request("GET", &url)
            .call()
            .map_err(map_error)?
            .into_json()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let mut snapshot = Snapshot::new();
        for row in rows {
            match DataKey::from_name(&row.key) {
                Some(key) if key.is_synced() && !row.value.is_null() => {
                    snapshot.insert(key, row.value);
                }
                Some(_) => {}
                None => log::debug!("Ignoring unknown remote key {}", row.key),
            }
        }
        Ok(snapshot)
    }

    fn save(&self, key: DataKey, value: &Value) -> Result<(), StoreError> {
        let body = json!({
            "value": value,
            "updatedAt": chrono::Utc::now().timestamp_millis(),
        });
        self.request("PUT", &self.document_url(key))
            .send_json(body)
            .map_err(map_error)?;
        Ok(())
    }

    fn remove(&self, key: DataKey) -> Result<(), StoreError> {
        match self.request("DELETE", &self.document_url(key)).call() {
            Ok(_) | Err(ureq::Error::Status(404, _)) => Ok(()),
            Err(e) => Err(map_error(e)),
        }
    }
}
