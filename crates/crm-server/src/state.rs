use crm_core::clock::{Clock, SystemClock, Timestamp};
use crm_core::config::Config;
use crm_core::store::YamlStore;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    /// Overrides `session.user_id` from the config when set.
    pub user: Option<String>,
    pub clock: Arc<dyn Clock>,
    /// Serializes mutating requests so a check and the write it guards
    /// are not interleaved with another request's.
    pub writes: Arc<Mutex<()>>,
}

/// Everything a handler needs for one request, opened fresh each time so
/// edits made by the CLI in between are picked up.
pub struct Workspace {
    pub store: YamlStore,
    pub config: Config,
    pub owner: String,
    pub now: Timestamp,
}

impl AppState {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            user: None,
            clock: Arc::new(SystemClock),
            writes: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn open(&self) -> crm_core::Result<Workspace> {
        let store = YamlStore::open(&self.root)?;
        let mut config = Config::load(&self.root)?;
        if let Some(user) = &self.user {
            config.session.user_id = user.clone();
        }
        Ok(Workspace {
            store,
            owner: config.session.user_id.clone(),
            config,
            now: self.clock.now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_core::clock::FixedClock;

    #[test]
    fn new_state_stores_root() {
        let state = AppState::new(PathBuf::from("/tmp/test"));
        assert_eq!(state.root, PathBuf::from("/tmp/test"));
        assert!(state.user.is_none());
    }

    #[test]
    fn open_uninitialized_root_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let state = AppState::new(dir.path().to_path_buf());
        assert!(matches!(
            state.open(),
            Err(crm_core::CrmError::NotInitialized)
        ));
    }

    #[test]
    fn user_override_and_clock_apply() {
        let dir = tempfile::TempDir::new().unwrap();
        crm_core::actions::init(dir.path(), "ana").unwrap();
        let clock = FixedClock::parse("2025-02-03T10:00:00+01:00").unwrap();
        let state = AppState::new(dir.path().to_path_buf())
            .with_user(Some("bo".into()))
            .with_clock(Arc::new(clock));
        let ws = state.open().unwrap();
        assert_eq!(ws.owner, "bo");
        assert_eq!(ws.now, clock.0);
    }
}
