use crate::clock::Timestamp;
use crate::config::{QuotaConfig, SessionConfig};
use crate::deal::Deal;
use crate::error::CrmError;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Commit, best case and funnel totals measured against a monthly quota.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotaSummary {
    pub current_commit: f64,
    pub best_case: f64,
    pub total_funnel: f64,
    pub commit_pct: f64,
    pub best_case_pct: f64,
}

fn pct(value: f64, quota: f64) -> f64 {
    if quota > 0.0 {
        value / quota * 100.0
    } else {
        0.0
    }
}

/// Sum deal MRC into commit (committed, closing this month), best case
/// (closing this month) and funnel (everything), where "this month" is the
/// calendar month of `now`. Percentages are 0 for a non-positive quota.
pub fn aggregate_quota(deals: &[Deal], quota: f64, now: &Timestamp) -> QuotaSummary {
    let (year, month) = (now.year(), now.month());
    let mut summary = QuotaSummary::default();
    for deal in deals {
        summary.total_funnel += deal.mrc;
        if deal.closes_in(year, month) {
            summary.best_case += deal.mrc;
            if deal.is_committed {
                summary.current_commit += deal.mrc;
            }
        }
    }
    summary.commit_pct = pct(summary.current_commit, quota);
    summary.best_case_pct = pct(summary.best_case, quota);
    summary
}

// ---------------------------------------------------------------------------
// ForecastScope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastScope {
    #[default]
    Mine,
    Team,
}

impl ForecastScope {
    pub fn as_str(self) -> &'static str {
        match self {
            ForecastScope::Mine => "mine",
            ForecastScope::Team => "team",
        }
    }

    /// The scope actually granted to `session`. Only managers see the team.
    pub fn effective(self, session: &SessionConfig) -> ForecastScope {
        match self {
            ForecastScope::Team if session.is_manager => ForecastScope::Team,
            _ => ForecastScope::Mine,
        }
    }

    /// Owner filter for fetching deals: `None` means every owner.
    pub fn owner_filter(self, session: &SessionConfig) -> Option<&str> {
        match self.effective(session) {
            ForecastScope::Team => None,
            ForecastScope::Mine => Some(session.user_id.as_str()),
        }
    }

    pub fn quota(self, session: &SessionConfig, quotas: &QuotaConfig) -> f64 {
        match self.effective(session) {
            ForecastScope::Team => quotas.team_quota(),
            ForecastScope::Mine => quotas.quota_for(&session.user_id),
        }
    }
}

impl fmt::Display for ForecastScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ForecastScope {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mine" | "me" => Ok(ForecastScope::Mine),
            "team" => Ok(ForecastScope::Team),
            _ => Err(CrmError::validation(format!(
                "unknown forecast scope '{s}' (expected mine or team)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserQuota;
    use chrono::{DateTime, NaiveDate};

    fn now() -> Timestamp {
        DateTime::parse_from_rfc3339("2025-06-14T10:00:00-05:00").unwrap()
    }

    fn deal(mrc: f64, close: Option<(i32, u32)>, committed: bool) -> Deal {
        let mut d = Deal::new("rep", "d", mrc);
        d.close_month = close.and_then(|(y, m)| NaiveDate::from_ymd_opt(y, m, 1));
        d.is_committed = committed;
        d
    }

    #[test]
    fn commit_best_case_and_funnel() {
        let deals = vec![
            deal(1000.0, Some((2025, 6)), true),
            deal(2000.0, Some((2025, 6)), false),
            deal(500.0, Some((2025, 7)), true),
        ];
        let s = aggregate_quota(&deals, 2000.0, &now());
        assert_eq!(s.current_commit, 1000.0);
        assert_eq!(s.commit_pct, 50.0);
        assert_eq!(s.best_case, 3000.0);
        assert_eq!(s.best_case_pct, 150.0);
        assert_eq!(s.total_funnel, 3500.0);
    }

    #[test]
    fn same_month_other_year_is_not_this_month() {
        let deals = vec![deal(700.0, Some((2024, 6)), true), deal(50.0, None, true)];
        let s = aggregate_quota(&deals, 1000.0, &now());
        assert_eq!(s.current_commit, 0.0);
        assert_eq!(s.best_case, 0.0);
        assert_eq!(s.total_funnel, 750.0);
    }

    #[test]
    fn zero_or_negative_quota_yields_zero_percent() {
        let deals = vec![deal(1000.0, Some((2025, 6)), true)];
        for quota in [0.0, -10.0] {
            let s = aggregate_quota(&deals, quota, &now());
            assert_eq!(s.commit_pct, 0.0);
            assert_eq!(s.best_case_pct, 0.0);
            assert!(s.commit_pct.is_finite());
        }
    }

    #[test]
    fn empty_deal_set_is_all_zero() {
        assert_eq!(aggregate_quota(&[], 5000.0, &now()), QuotaSummary::default());
    }

    #[test]
    fn team_scope_requires_manager() {
        let quotas = QuotaConfig {
            monthly_quota: 5000.0,
            team: vec![
                UserQuota {
                    user_id: "ana".into(),
                    monthly_quota: 3000.0,
                },
                UserQuota {
                    user_id: "bo".into(),
                    monthly_quota: 4000.0,
                },
            ],
        };
        let mut session = SessionConfig {
            user_id: "ana".into(),
            is_manager: false,
        };
        assert_eq!(ForecastScope::Team.effective(&session), ForecastScope::Mine);
        assert_eq!(ForecastScope::Team.owner_filter(&session), Some("ana"));
        assert_eq!(ForecastScope::Team.quota(&session, &quotas), 3000.0);

        session.is_manager = true;
        assert_eq!(ForecastScope::Team.owner_filter(&session), None);
        assert_eq!(ForecastScope::Team.quota(&session, &quotas), 7000.0);
        assert_eq!(ForecastScope::Mine.quota(&session, &quotas), 3000.0);
    }

    #[test]
    fn scope_parses() {
        assert_eq!("TEAM".parse::<ForecastScope>().unwrap(), ForecastScope::Team);
        assert_eq!("mine".parse::<ForecastScope>().unwrap(), ForecastScope::Mine);
        assert!("everyone".parse::<ForecastScope>().is_err());
    }
}
