pub mod account;
pub mod activity;
pub mod contact;
pub mod deal;
pub mod due;
pub mod enroll;
pub mod init;
pub mod quota;
pub mod sequence;
pub mod serve;
pub mod task;

use anyhow::Context;
use crm_core::clock::{Clock, FixedClock, SystemClock, Timestamp};
use crm_core::config::Config;
use crm_core::store::YamlStore;
use std::path::PathBuf;

/// Global flags every subcommand sees.
#[derive(Debug, Clone)]
pub struct Globals {
    pub root: PathBuf,
    pub user: Option<String>,
    pub now: Option<String>,
    pub json: bool,
}

impl Globals {
    pub fn clock(&self) -> anyhow::Result<Box<dyn Clock>> {
        match &self.now {
            Some(ts) => {
                let fixed = FixedClock::parse(ts)
                    .with_context(|| format!("--now '{ts}' is not an RFC 3339 timestamp"))?;
                Ok(Box::new(fixed))
            }
            None => Ok(Box::new(SystemClock)),
        }
    }

    /// Open the store and config for a command that needs an initialized root.
    pub fn session(&self) -> anyhow::Result<Session> {
        let store = YamlStore::open(&self.root)
            .with_context(|| format!("no CRM data at {}", self.root.display()))?;
        let mut config = Config::load(&self.root).context("failed to load .crm/config.yaml")?;
        if let Some(user) = &self.user {
            config.session.user_id = user.clone();
        }
        for warning in config.validate() {
            tracing::warn!("config: {}", warning.message);
        }
        Ok(Session {
            owner: config.session.user_id.clone(),
            now: self.clock()?.now(),
            store,
            config,
        })
    }
}

pub struct Session {
    pub store: YamlStore,
    pub config: Config,
    pub owner: String,
    pub now: Timestamp,
}
