use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};

const TOKEN_FILE: &str = "session.token";
const USER_FILE: &str = "session.user.json";

/// Opaque marker standing in for a real token; presence is what matters.
pub const TOKEN_MARKER: &str = "local-session";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Loading,
    Authenticated,
}

/// Process-wide authentication state backed by two persisted values in the
/// workspace: a token marker and the serialized user. Starts `Loading` when
/// a token survives from a previous run, and resolves to `Authenticated` or
/// `Anonymous` on the first who-am-I check.
pub struct SessionStore {
    dir: PathBuf,
    state: SessionState,
    user: Option<Value>,
}

impl SessionStore {
    pub fn open(workspace: &Path) -> SessionStore {
        let state = if workspace.join(TOKEN_FILE).exists() {
            SessionState::Loading
        } else {
            SessionState::Anonymous
        };
        SessionStore {
            dir: workspace.to_path_buf(),
            state,
            user: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Who-am-I. Resolves a pending `Loading` state by re-reading the
    /// persisted user and checking it still exists; a failed check clears
    /// the persisted values rather than leaving a dangling session.
    pub fn resolve<F>(&mut self, user_still_exists: F) -> Option<Value>
    where
        F: FnOnce(&str) -> bool,
    {
        match self.state {
            SessionState::Authenticated => self.user.clone(),
            SessionState::Anonymous => None,
            SessionState::Loading => {
                let user = std::fs::read_to_string(self.dir.join(USER_FILE))
                    .ok()
                    .and_then(|raw| serde_json::from_str::<Value>(&raw).ok());
                let id = user
                    .as_ref()
                    .and_then(|u| u.get("id"))
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());
                match (user, id) {
                    (Some(user), Some(id)) if user_still_exists(&id) => {
                        self.state = SessionState::Authenticated;
                        self.user = Some(user.clone());
                        Some(user)
                    }
                    _ => {
                        self.clear();
                        None
                    }
                }
            }
        }
    }

    /// Persist a session for `user` (already password-stripped, domain keys)
    /// and move to `Authenticated`.
    pub fn establish(&mut self, user: Value) -> Result<()> {
        std::fs::write(self.dir.join(TOKEN_FILE), TOKEN_MARKER)?;
        std::fs::write(self.dir.join(USER_FILE), serde_json::to_string(&user)?)?;
        self.state = SessionState::Authenticated;
        self.user = Some(user);
        Ok(())
    }

    /// Clear local state unconditionally. Removal failures are ignored so a
    /// logout can never leave the caller stuck authenticated.
    pub fn clear(&mut self) {
        let _ = std::fs::remove_file(self.dir.join(TOKEN_FILE));
        let _ = std::fs::remove_file(self.dir.join(USER_FILE));
        self.state = SessionState::Anonymous;
        self.user = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("academyd-{}-{}", tag, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn fresh_workspace_starts_anonymous() {
        let dir = temp_dir("session-fresh");
        let store = SessionStore::open(&dir);
        assert_eq!(store.state(), SessionState::Anonymous);
    }

    #[test]
    fn login_persists_and_survives_reopen() {
        let dir = temp_dir("session-persist");
        let mut store = SessionStore::open(&dir);
        store
            .establish(json!({ "id": "u1", "name": "T", "email": "t@x" }))
            .expect("establish");
        assert_eq!(store.state(), SessionState::Authenticated);

        let mut reopened = SessionStore::open(&dir);
        assert_eq!(reopened.state(), SessionState::Loading);
        let user = reopened.resolve(|id| id == "u1");
        assert_eq!(user.unwrap()["id"], json!("u1"));
        assert_eq!(reopened.state(), SessionState::Authenticated);
    }

    #[test]
    fn failed_identity_check_clears_persisted_state() {
        let dir = temp_dir("session-stale");
        let mut store = SessionStore::open(&dir);
        store
            .establish(json!({ "id": "gone", "name": "T" }))
            .expect("establish");

        let mut reopened = SessionStore::open(&dir);
        assert!(reopened.resolve(|_| false).is_none());
        assert_eq!(reopened.state(), SessionState::Anonymous);
        // Next open must not see a token either.
        assert_eq!(SessionStore::open(&dir).state(), SessionState::Anonymous);
    }

    #[test]
    fn logout_clears_even_without_prior_files() {
        let dir = temp_dir("session-logout");
        let mut store = SessionStore::open(&dir);
        store.clear();
        assert_eq!(store.state(), SessionState::Anonymous);
    }
}
