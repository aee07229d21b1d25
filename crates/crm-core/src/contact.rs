use crate::error::{CrmError, Result};
use crate::store::{Record, Table};
use crate::types::RecordId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub id: RecordId,
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub notes: String,
}

impl Account {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: 0,
            owner: owner.into(),
            name: name.into(),
            website: String::new(),
            industry: String::new(),
            phone: String::new(),
            address: String::new(),
            notes: String::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CrmError::validation("account name is required"));
        }
        Ok(())
    }
}

impl Record for Account {
    const TABLE: Table = Table::Accounts;

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

// ---------------------------------------------------------------------------
// Contact
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub id: RecordId,
    pub owner: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub account_id: Option<RecordId>,
}

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_re() -> &'static Regex {
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

impl Contact {
    pub fn new(
        owner: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            owner: owner.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
            phone: String::new(),
            title: String::new(),
            notes: String::new(),
            account_id: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// A usable address for an email step, if any.
    pub fn email_address(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if self.first_name.trim().is_empty() && self.last_name.trim().is_empty() {
            return Err(CrmError::validation("contact needs a first or last name"));
        }
        if let Some(email) = self.email_address() {
            if !email_re().is_match(email) {
                return Err(CrmError::validation(format!(
                    "'{email}' is not a valid email address"
                )));
            }
        }
        Ok(())
    }
}

impl Record for Contact {
    const TABLE: Table = Table::Contacts;

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

// ---------------------------------------------------------------------------
// Edits
// ---------------------------------------------------------------------------

/// Partial edit of an account. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl AccountPatch {
    pub fn check(&self, account: &Account) -> Result<()> {
        let mut preview = account.clone();
        self.apply(&mut preview);
        preview.validate()
    }

    pub fn apply(&self, account: &mut Account) {
        let fields = [
            (&self.name, &mut account.name),
            (&self.website, &mut account.website),
            (&self.industry, &mut account.industry),
            (&self.phone, &mut account.phone),
            (&self.address, &mut account.address),
        ];
        for (new, field) in fields {
            if let Some(value) = new {
                *field = value.trim().to_string();
            }
        }
        if let Some(notes) = &self.notes {
            account.notes = notes.clone();
        }
    }
}

/// Partial edit of a contact. An empty `email` clears the address;
/// `account_id: Some(None)` detaches the contact from its account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactPatch {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Option<RecordId>>,
}

impl ContactPatch {
    pub fn check(&self, contact: &Contact) -> Result<()> {
        let mut preview = contact.clone();
        self.apply(&mut preview);
        preview.validate()
    }

    pub fn apply(&self, contact: &mut Contact) {
        let fields = [
            (&self.first_name, &mut contact.first_name),
            (&self.last_name, &mut contact.last_name),
            (&self.phone, &mut contact.phone),
            (&self.title, &mut contact.title),
        ];
        for (new, field) in fields {
            if let Some(value) = new {
                *field = value.trim().to_string();
            }
        }
        if let Some(email) = &self.email {
            let email = email.trim();
            contact.email = (!email.is_empty()).then(|| email.to_string());
        }
        if let Some(notes) = &self.notes {
            contact.notes = notes.clone();
        }
        if let Some(account_id) = self.account_id {
            contact.account_id = account_id;
        }
    }
}
