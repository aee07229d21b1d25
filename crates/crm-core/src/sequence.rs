use crate::contact::Contact;
use crate::error::{CrmError, Result};
use crate::store::{Record, Table};
use crate::types::{RecordId, StepType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Sequence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sequence {
    #[serde(default)]
    pub id: RecordId,
    pub owner: String,
    pub name: String,
}

impl Sequence {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: 0,
            owner: owner.into(),
            name: name.into().trim().to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CrmError::validation("sequence name is required"));
        }
        Ok(())
    }
}

impl Record for Sequence {
    const TABLE: Table = Table::Sequences;

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
// SequenceStep
// ---------------------------------------------------------------------------

/// One templated outreach action. Steps form a shared catalog and carry no owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceStep {
    #[serde(default)]
    pub id: RecordId,
    pub sequence_id: RecordId,
    pub step_number: u32,
    #[serde(rename = "type")]
    pub step_type: StepType,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    /// Days to wait after the previous step before this one is due.
    #[serde(default)]
    pub delay_days: u32,
}

impl SequenceStep {
    pub fn new(sequence_id: RecordId, step_number: u32, step_type: StepType, delay_days: u32) -> Self {
        Self {
            id: 0,
            sequence_id,
            step_number,
            step_type,
            subject: String::new(),
            message: String::new(),
            delay_days,
        }
    }

    /// Subject, else message, else a generic label.
    pub fn summary(&self) -> &str {
        [self.subject.trim(), self.message.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or("Completed step")
    }

    /// What the operator does to work this step for `contact`.
    pub fn action_hint(&self, contact: Option<&Contact>) -> &'static str {
        match self.step_type {
            StepType::Email if contact.and_then(Contact::email_address).is_some() => "send email",
            StepType::Linkedin => "open linkedin",
            _ => "complete",
        }
    }
}

impl Record for SequenceStep {
    const TABLE: Table = Table::SequenceSteps;

    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn owner(&self) -> Option<&str> {
        None
    }
}

// ---------------------------------------------------------------------------
// Catalog queries
// ---------------------------------------------------------------------------

/// Steps of one sequence ordered by step number.
pub fn steps_for(steps: &[SequenceStep], sequence_id: RecordId) -> Vec<&SequenceStep> {
    let mut found: Vec<&SequenceStep> = steps
        .iter()
        .filter(|s| s.sequence_id == sequence_id)
        .collect();
    found.sort_by_key(|s| s.step_number);
    found
}

pub fn find_step(
    steps: &[SequenceStep],
    sequence_id: RecordId,
    step_number: u32,
) -> Option<&SequenceStep> {
    steps
        .iter()
        .find(|s| s.sequence_id == sequence_id && s.step_number == step_number)
}

/// The lowest-numbered step of a sequence.
pub fn first_step(steps: &[SequenceStep], sequence_id: RecordId) -> Option<&SequenceStep> {
    steps
        .iter()
        .filter(|s| s.sequence_id == sequence_id)
        .min_by_key(|s| s.step_number)
}

/// Number for a step appended to a sequence: one past the highest, or 1.
pub fn next_step_number(steps: &[SequenceStep], sequence_id: RecordId) -> Result<u32> {
    match steps
        .iter()
        .filter(|s| s.sequence_id == sequence_id)
        .map(|s| s.step_number)
        .max()
    {
        None => Ok(1),
        Some(n) => n.checked_add(1).ok_or_else(|| {
            CrmError::validation(format!(
                "sequence {sequence_id} already ends at step {n}; give the new step an explicit number"
            ))
        }),
    }
}

/// Check a new step against the catalog before insert.
pub fn validate_new_step(steps: &[SequenceStep], step: &SequenceStep) -> Result<()> {
    if step.step_number == 0 {
        return Err(CrmError::validation("step numbers start at 1"));
    }
    if find_step(steps, step.sequence_id, step.step_number).is_some() {
        return Err(CrmError::validation(format!(
            "sequence {} already has a step {}",
            step.sequence_id, step.step_number
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Personalization
// ---------------------------------------------------------------------------

static FIRST_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn first_name_re() -> &'static Regex {
    FIRST_NAME_RE.get_or_init(|| Regex::new(r"\{\{\s*firstName\s*\}\}").unwrap())
}

/// Fill `{{firstName}}` placeholders in a step template.
pub fn personalize(template: &str, contact: &Contact) -> String {
    first_name_re()
        .replace_all(template, regex::NoExpand(contact.first_name.as_str()))
        .into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<SequenceStep> {
        vec![
            SequenceStep::new(1, 2, StepType::Call, 3),
            SequenceStep::new(1, 1, StepType::Email, 0),
            SequenceStep::new(2, 5, StepType::Linkedin, 1),
        ]
    }

    #[test]
    fn steps_for_orders_by_number() {
        let steps = catalog();
        let ordered: Vec<u32> = steps_for(&steps, 1).iter().map(|s| s.step_number).collect();
        assert_eq!(ordered, vec![1, 2]);
        assert!(steps_for(&steps, 9).is_empty());
    }

    #[test]
    fn first_step_is_lowest_number() {
        let steps = catalog();
        assert_eq!(first_step(&steps, 2).unwrap().step_number, 5);
        assert!(first_step(&steps, 3).is_none());
    }

    #[test]
    fn next_step_number_appends() {
        let steps = catalog();
        assert_eq!(next_step_number(&steps, 1).unwrap(), 3);
        assert_eq!(next_step_number(&steps, 42).unwrap(), 1);
    }

    #[test]
    fn next_step_number_at_top_of_range_is_rejected() {
        let steps = vec![SequenceStep::new(7, u32::MAX, StepType::Call, 0)];
        assert!(matches!(
            next_step_number(&steps, 7),
            Err(CrmError::Validation(_))
        ));
    }

    #[test]
    fn duplicate_step_number_rejected() {
        let steps = catalog();
        let dup = SequenceStep::new(1, 2, StepType::Other, 0);
        assert!(validate_new_step(&steps, &dup).is_err());
        let zero = SequenceStep::new(1, 0, StepType::Other, 0);
        assert!(validate_new_step(&steps, &zero).is_err());
        let fresh = SequenceStep::new(1, 3, StepType::Other, 0);
        assert!(validate_new_step(&steps, &fresh).is_ok());
    }

    #[test]
    fn summary_falls_back() {
        let mut s = SequenceStep::new(1, 1, StepType::Email, 0);
        assert_eq!(s.summary(), "Completed step");
        s.message = "Checking in".into();
        assert_eq!(s.summary(), "Checking in");
        s.subject = "Intro".into();
        assert_eq!(s.summary(), "Intro");
    }

    #[test]
    fn action_hint_needs_email_address() {
        let step = SequenceStep::new(1, 1, StepType::Email, 0);
        let mut c = Contact::new("u", "Ada", "L");
        assert_eq!(step.action_hint(Some(&c)), "complete");
        c.email = Some("ada@example.com".into());
        assert_eq!(step.action_hint(Some(&c)), "send email");
        let li = SequenceStep::new(1, 2, StepType::Linkedin, 0);
        assert_eq!(li.action_hint(None), "open linkedin");
    }

    #[test]
    fn personalize_replaces_every_placeholder() {
        let c = Contact::new("u", "Grace", "Hopper");
        assert_eq!(
            personalize("Hi {{firstName}}, {{ firstName }}!", &c),
            "Hi Grace, Grace!"
        );
        let dollar = Contact::new("u", "$1", "");
        assert_eq!(personalize("Hi {{firstName}}", &dollar), "Hi $1");
    }

    #[test]
    fn step_yaml_uses_type_key() {
        let yaml = "sequence_id: 1\nstep_number: 1\ntype: Email\ndelay_days: 2\n";
        let step: SequenceStep = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(step.step_type, StepType::Email);
        assert_eq!(step.delay_days, 2);
        assert!(step.subject.is_empty());
    }
}
