use crate::error::{CrmError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Identity of the operator issuing commands. Every owned record is scoped to
/// `user_id`; `is_manager` unlocks the team forecast view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub user_id: String,
    #[serde(default)]
    pub is_manager: bool,
}

// ---------------------------------------------------------------------------
// QuotaConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserQuota {
    pub user_id: String,
    pub monthly_quota: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    #[serde(default = "default_monthly_quota")]
    pub monthly_quota: f64,
    /// Per-user quotas for the team view.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub team: Vec<UserQuota>,
}

fn default_monthly_quota() -> f64 {
    5000.0
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            monthly_quota: default_monthly_quota(),
            team: Vec::new(),
        }
    }
}

impl QuotaConfig {
    /// A user's own quota: their team entry when present, else the default.
    pub fn quota_for(&self, user_id: &str) -> f64 {
        self.team
            .iter()
            .find(|q| q.user_id == user_id)
            .map(|q| q.monthly_quota)
            .unwrap_or(self.monthly_quota)
    }

    /// Sum of every team member's monthly quota. Without a team roster this
    /// is just the default quota.
    pub fn team_quota(&self) -> f64 {
        if self.team.is_empty() {
            return self.monthly_quota;
        }
        self.team.iter().map(|q| q.monthly_quota).sum()
    }
}

// ---------------------------------------------------------------------------
// DashboardConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_recent_activity_limit")]
    pub recent_activity_limit: usize,
}

fn default_recent_activity_limit() -> usize {
    20
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            recent_activity_limit: default_recent_activity_limit(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub session: SessionConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            version: 1,
            session: SessionConfig {
                user_id: user_id.into(),
                is_manager: false,
            },
            quota: QuotaConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        crate::io::read_yaml(&paths::config_path(root))?.ok_or(CrmError::NotInitialized)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        crate::io::write_yaml(&paths::config_path(root), self)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.session.user_id.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "session.user_id is empty".to_string(),
            });
        }

        if !self.quota.monthly_quota.is_finite() || self.quota.monthly_quota < 0.0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "quota.monthly_quota must be a non-negative number, got {}",
                    self.quota.monthly_quota
                ),
            });
        } else if self.quota.monthly_quota == 0.0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "quota.monthly_quota is 0: quota percentages will read 0%".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for q in &self.quota.team {
            if !seen.insert(q.user_id.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("duplicate team quota for user '{}'", q.user_id),
                });
            }
            if !q.monthly_quota.is_finite() || q.monthly_quota < 0.0 {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!(
                        "team quota for '{}' must be a non-negative number, got {}",
                        q.user_id, q.monthly_quota
                    ),
                });
            }
        }

        if self.session.is_manager && self.quota.team.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "manager session without quota.team: team view uses the default quota"
                    .to_string(),
            });
        }

        if self.dashboard.recent_activity_limit == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "dashboard.recent_activity_limit is 0: the activity feed is empty"
                    .to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::new("rep-1");
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.session.user_id, "rep-1");
        assert_eq!(parsed.quota.monthly_quota, 5000.0);
        assert_eq!(parsed.dashboard.recent_activity_limit, 20);
    }

    #[test]
    fn minimal_yaml_fills_defaults() {
        let cfg: Config = serde_yaml::from_str("session:\n  user_id: alice\n").unwrap();
        assert_eq!(cfg.version, 1);
        assert!(!cfg.session.is_manager);
        assert_eq!(cfg.quota.monthly_quota, 5000.0);
    }

    #[test]
    fn load_missing_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(CrmError::NotInitialized)
        ));
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new("alice");
        cfg.quota.monthly_quota = 7500.0;
        cfg.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.quota.monthly_quota, 7500.0);
    }

    #[test]
    fn team_quota_sums_roster() {
        let quota = QuotaConfig {
            monthly_quota: 5000.0,
            team: vec![
                UserQuota {
                    user_id: "alice".into(),
                    monthly_quota: 4000.0,
                },
                UserQuota {
                    user_id: "bob".into(),
                    monthly_quota: 6000.0,
                },
            ],
        };
        assert_eq!(quota.team_quota(), 10000.0);
        assert_eq!(quota.quota_for("alice"), 4000.0);
        assert_eq!(quota.quota_for("carol"), 5000.0);
    }

    #[test]
    fn validate_flags_duplicates_and_negatives() {
        let mut cfg = Config::new("alice");
        cfg.quota.team = vec![
            UserQuota {
                user_id: "alice".into(),
                monthly_quota: -1.0,
            },
            UserQuota {
                user_id: "alice".into(),
                monthly_quota: 10.0,
            },
        ];
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.message.contains("duplicate")));
        assert!(warnings.iter().any(|w| w.message.contains("non-negative")));
    }

    #[test]
    fn validate_clean_config() {
        assert!(Config::new("alice").validate().is_empty());
    }
}
