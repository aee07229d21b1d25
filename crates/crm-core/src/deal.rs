use crate::error::{CrmError, Result};
use crate::store::{Record, Table};
use crate::types::{DealStage, RecordId};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    #[serde(default)]
    pub id: RecordId,
    pub owner: String,
    #[serde(default)]
    pub account_id: Option<RecordId>,
    pub name: String,
    #[serde(default)]
    pub stage: DealStage,
    /// Monthly recurring charge.
    #[serde(default)]
    pub mrc: f64,
    /// Any date inside the expected close month; only year and month are read.
    #[serde(default)]
    pub close_month: Option<NaiveDate>,
    #[serde(default)]
    pub is_committed: bool,
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub products: String,
}

impl Deal {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, mrc: f64) -> Self {
        Self {
            id: 0,
            owner: owner.into(),
            account_id: None,
            name: name.into().trim().to_string(),
            stage: DealStage::default(),
            mrc,
            close_month: None,
            is_committed: false,
            term: String::new(),
            products: String::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CrmError::validation("deal name is required"));
        }
        validate_mrc(self.mrc)
    }

    /// Whether the close month is `year`/`month` (1-based month).
    pub fn closes_in(&self, year: i32, month: u32) -> bool {
        self.close_month
            .is_some_and(|d| d.year() == year && d.month() == month)
    }
}

impl Record for Deal {
    const TABLE: Table = Table::Deals;

    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn owner(&self) -> Option<&str> {
        Some(&self.owner)
    }
}

fn validate_mrc(mrc: f64) -> Result<()> {
    if !mrc.is_finite() || mrc < 0.0 {
        return Err(CrmError::validation(format!(
            "MRC must be a non-negative number, got {mrc}"
        )));
    }
    Ok(())
}

/// Parse operator-entered MRC text such as `"1,250.50"` or `"$900"`.
pub fn parse_mrc(input: &str) -> Result<f64> {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '$'))
        .collect();
    let mrc: f64 = cleaned
        .parse()
        .map_err(|_| CrmError::validation(format!("MRC '{input}' is not a number")))?;
    validate_mrc(mrc)?;
    Ok(mrc)
}

/// Parse a close month given as `YYYY-MM` or `YYYY-MM-DD`.
pub fn parse_close_month(input: &str) -> Result<NaiveDate> {
    let s = input.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d"))
        .map_err(|_| {
            CrmError::validation(format!(
                "close month '{input}' must look like YYYY-MM or YYYY-MM-DD"
            ))
        })
}

// ---------------------------------------------------------------------------
// DealPatch
// ---------------------------------------------------------------------------

/// Partial edit of a deal. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DealPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub stage: Option<DealStage>,
    #[serde(default)]
    pub mrc: Option<f64>,
    #[serde(default)]
    pub close_month: Option<NaiveDate>,
    #[serde(default)]
    pub is_committed: Option<bool>,
    #[serde(default)]
    pub term: Option<String>,
    #[serde(default)]
    pub products: Option<String>,
}

impl DealPatch {
    /// Validate the patch against `deal` without mutating it.
    pub fn check(&self, deal: &Deal) -> Result<()> {
        let mut preview = deal.clone();
        self.apply(&mut preview);
        preview.validate()
    }

    pub fn apply(&self, deal: &mut Deal) {
        if let Some(name) = &self.name {
            deal.name = name.trim().to_string();
        }
        if let Some(stage) = self.stage {
            deal.stage = stage;
        }
        if let Some(mrc) = self.mrc {
            deal.mrc = mrc;
        }
        if let Some(close) = self.close_month {
            deal.close_month = Some(close);
        }
        if let Some(committed) = self.is_committed {
            deal.is_committed = committed;
        }
        if let Some(term) = &self.term {
            deal.term = term.clone();
        }
        if let Some(products) = &self.products {
            deal.products = products.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline breakdown
// ---------------------------------------------------------------------------

/// Count of open (not closed won/lost) deals per stage.
pub fn open_deals_by_stage(deals: &[Deal]) -> BTreeMap<DealStage, usize> {
    let mut counts = BTreeMap::new();
    for deal in deals.iter().filter(|d| !d.stage.is_closed()) {
        *counts.entry(deal.stage).or_insert(0) += 1;
    }
    counts
}
