//! Usage: Durable session storage behind a swappable trait.
//!
//! The persisted document mirrors the storage keys the web client used: the
//! session record under `auth-storage`, the access token duplicated under a
//! plain `accessToken` key, and the refresh token under `refreshToken`.

use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::session::{AuthUser, Session};
use crate::shared::error::{codes, AppError, AppResult};
use crate::shared::mutex_ext::MutexExt;

/// Where sessions survive process restarts. Implementations must treat
/// `save` as all-or-nothing: a partially written session must never load.
pub trait SessionPersistence: Send + Sync {
    fn load(&self) -> AppResult<Option<Session>>;
    fn save(&self, session: &Session) -> AppResult<()>;
    fn clear(&self) -> AppResult<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedRecord {
    token: String,
    user: AuthUser,
    #[serde(rename = "isAuthenticated")]
    is_authenticated: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedState {
    #[serde(rename = "auth-storage")]
    auth_storage: PersistedRecord,
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "refreshToken", skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

impl PersistedState {
    fn from_session(session: &Session) -> Self {
        Self {
            auth_storage: PersistedRecord {
                token: session.access_token.clone(),
                user: session.user.clone(),
                is_authenticated: true,
            },
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
        }
    }

    fn into_session(self) -> Option<Session> {
        if !self.auth_storage.is_authenticated || self.auth_storage.token.trim().is_empty() {
            return None;
        }
        Some(Session {
            access_token: self.auth_storage.token,
            refresh_token: self
                .refresh_token
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            user: self.auth_storage.user,
        })
    }
}

/// JSON-file persistence with atomic tmp/backup/rename writes.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionPersistence for FileSessionStore {
    fn load(&self) -> AppResult<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| format!("STORAGE_ERROR: failed to read session file: {e}"))?;
        let state: PersistedState = serde_json::from_str(&content)
            .map_err(|e| format!("STORAGE_ERROR: failed to parse session file: {e}"))?;
        Ok(state.into_session())
    }

    fn save(&self, session: &Session) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("STORAGE_ERROR: failed to create session dir: {e}"))?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let backup_path = self.path.with_extension("json.bak");

        let content = serde_json::to_vec_pretty(&PersistedState::from_session(session))
            .map_err(|e| format!("STORAGE_ERROR: failed to serialize session: {e}"))?;

        std::fs::write(&tmp_path, content)
            .map_err(|e| format!("STORAGE_ERROR: failed to write temp session file: {e}"))?;

        if backup_path.exists() {
            let _ = std::fs::remove_file(&backup_path);
        }
        if self.path.exists() {
            std::fs::rename(&self.path, &backup_path)
                .map_err(|e| format!("STORAGE_ERROR: failed to back up session file: {e}"))?;
        }
        if let Err(e) = std::fs::rename(&tmp_path, &self.path) {
            let _ = std::fs::rename(&backup_path, &self.path);
            return Err(format!("STORAGE_ERROR: failed to finalize session file: {e}").into());
        }
        if backup_path.exists() {
            let _ = std::fs::remove_file(&backup_path);
        }

        Ok(())
    }

    fn clear(&self) -> AppResult<()> {
        for path in [
            self.path.clone(),
            self.path.with_extension("json.tmp"),
            self.path.with_extension("json.bak"),
        ] {
            if path.exists() {
                std::fs::remove_file(&path).map_err(|e| {
                    AppError::new(
                        codes::STORAGE_ERROR,
                        format!("failed to remove session file: {e}"),
                    )
                })?;
            }
        }
        Ok(())
    }
}

/// In-memory persistence for tests and embedders that handle durability themselves.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<Session>>,
}

impl SessionPersistence for MemorySessionStore {
    fn load(&self) -> AppResult<Option<Session>> {
        Ok(self.inner.lock_or_recover().clone())
    }

    fn save(&self, session: &Session) -> AppResult<()> {
        *self.inner.lock_or_recover() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> AppResult<()> {
        *self.inner.lock_or_recover() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::test_session;

    #[test]
    fn file_store_round_trips_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileSessionStore::new(dir.path().join("session.json"));

        assert!(store.load().expect("load empty").is_none());

        let session = test_session("t1");
        store.save(&session).expect("save");
        let loaded = store.load().expect("load").expect("session present");
        assert_eq!(loaded, session);
    }

    #[test]
    fn file_store_document_uses_web_storage_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        let store = FileSessionStore::new(&path);
        store.save(&test_session("t1")).expect("save");

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read"))
                .expect("valid json");
        assert_eq!(raw["auth-storage"]["token"], "t1");
        assert_eq!(raw["auth-storage"]["isAuthenticated"], true);
        assert_eq!(raw["auth-storage"]["user"]["user_id"], "u1");
        assert_eq!(raw["accessToken"], "t1");
        assert_eq!(raw["refreshToken"], "refresh-1");
    }

    #[test]
    fn file_store_clear_removes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        let store = FileSessionStore::new(&path);
        store.save(&test_session("t1")).expect("save");
        store.clear().expect("clear");
        assert!(!path.exists());
        assert!(store.load().expect("load").is_none());
    }

    #[test]
    fn file_store_ignores_logged_out_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        std::fs::write(
            &path,
            r#"{
              "auth-storage": {
                "token": "t1",
                "user": {"user_id":"u1","full_name":"A","email":"a@b.com","role":"patient"},
                "isAuthenticated": false
              },
              "accessToken": "t1"
            }"#,
        )
        .expect("write");
        let store = FileSessionStore::new(&path);
        assert!(store.load().expect("load").is_none());
    }

    #[test]
    fn memory_store_round_trips_and_clears() {
        let store = MemorySessionStore::default();
        assert!(store.load().expect("load").is_none());
        store.save(&test_session("t1")).expect("save");
        assert!(store.load().expect("load").is_some());
        store.clear().expect("clear");
        assert!(store.load().expect("load").is_none());
    }
}
