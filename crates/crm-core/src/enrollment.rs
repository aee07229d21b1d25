//! Contact sequence progression.
//!
//! An enrollment ([`ContactSequence`]) ties one contact to one run through a
//! sequence. Every function here is pure: it reads a snapshot of records and
//! returns the record or patch the caller should persist. Nothing here talks
//! to a store.
//!
//! ```text
//!            assign
//!              │
//!              ▼
//!   ┌──────► Active ──complete (last step)──► Completed
//!   │          │
//!   └─complete/revisit
//!              │
//!            remove
//!              ▼
//!           Removed
//! ```

use crate::activity::Activity;
use crate::clock::{self, Timestamp};
use crate::error::{CrmError, Result};
use crate::sequence::{self, Sequence, SequenceStep};
use crate::store::{Record, Table};
use crate::types::{EnrollmentStatus, RecordId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ContactSequence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactSequence {
    #[serde(default)]
    pub id: RecordId,
    pub owner: String,
    pub contact_id: RecordId,
    pub sequence_id: RecordId,
    pub current_step_number: u32,
    pub status: EnrollmentStatus,
    #[serde(default)]
    pub last_completed_date: Option<Timestamp>,
    pub next_step_due_date: Timestamp,
}

impl ContactSequence {
    pub fn is_active(&self) -> bool {
        self.status == EnrollmentStatus::Active
    }

    /// Due when Active and the due date's calendar day, seen from `now`'s
    /// offset, is today or earlier. Time of day on either side is ignored.
    pub fn is_due(&self, now: &Timestamp) -> bool {
        self.is_active() && clock::calendar_day(&self.next_step_due_date, now.offset()) <= now.date_naive()
    }

    fn require_active(&self, to: EnrollmentStatus, action: &str) -> Result<()> {
        if self.is_active() {
            return Ok(());
        }
        Err(CrmError::InvalidTransition {
            from: self.status.to_string(),
            to: to.to_string(),
            reason: format!("cannot {action} enrollment {}: it is no longer active", self.id),
        })
    }
}

impl Record for ContactSequence {
    const TABLE: Table = Table::ContactSequences;

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
// EnrollmentPatch
// ---------------------------------------------------------------------------

/// Field changes to persist on an enrollment. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EnrollmentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completed_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_step_due_date: Option<Timestamp>,
}

impl EnrollmentPatch {
    pub fn apply(&self, enrollment: &mut ContactSequence) {
        if let Some(n) = self.current_step_number {
            enrollment.current_step_number = n;
        }
        if let Some(status) = self.status {
            enrollment.status = status;
        }
        if let Some(done) = self.last_completed_date {
            enrollment.last_completed_date = Some(done);
        }
        if let Some(due) = self.next_step_due_date {
            enrollment.next_step_due_date = due;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == EnrollmentPatch::default()
    }
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Build a new Active enrollment positioned on the sequence's lowest step.
///
/// Fails with `AlreadyEnrolled` when `existing` holds an Active enrollment
/// for the contact in any sequence, and with `EmptySequence` when the target
/// has no steps.
pub fn assign_sequence(
    owner: &str,
    contact_id: RecordId,
    sequence_id: RecordId,
    existing: &[ContactSequence],
    steps: &[SequenceStep],
    now: &Timestamp,
) -> Result<ContactSequence> {
    if let Some(active) = active_enrollment_for(contact_id, existing) {
        return Err(CrmError::AlreadyEnrolled {
            contact_id,
            sequence_id: active.sequence_id,
        });
    }
    let first = sequence::first_step(steps, sequence_id)
        .ok_or(CrmError::EmptySequence(sequence_id))?;

    Ok(ContactSequence {
        id: 0,
        owner: owner.to_string(),
        contact_id,
        sequence_id,
        current_step_number: first.step_number,
        status: EnrollmentStatus::Active,
        last_completed_date: None,
        next_step_due_date: clock::add_days(now, first.delay_days),
    })
}

/// Result of completing the current step: what to write back to the
/// enrollment and the activity to append.
#[derive(Debug, Clone, Serialize)]
pub struct StepCompletion {
    pub enrollment_id: RecordId,
    pub completed_step: u32,
    pub patch: EnrollmentPatch,
    pub activity: Activity,
}

impl StepCompletion {
    /// True when the completed step was the last one.
    pub fn finished(&self) -> bool {
        self.patch.status == Some(EnrollmentStatus::Completed)
    }
}

/// Complete the enrollment's current step.
///
/// The step record must exist; otherwise `StepNotFound` is returned and no
/// activity is produced. When a step numbered `current + 1` exists the
/// enrollment advances to it and becomes due after that step's delay;
/// otherwise the enrollment is Completed with its other fields unchanged.
pub fn complete_step(
    enrollment: &ContactSequence,
    steps: &[SequenceStep],
    account_id: Option<RecordId>,
    now: &Timestamp,
) -> Result<StepCompletion> {
    enrollment.require_active(EnrollmentStatus::Active, "complete a step on")?;

    let current = sequence::find_step(steps, enrollment.sequence_id, enrollment.current_step_number)
        .ok_or(CrmError::StepNotFound {
            sequence_id: enrollment.sequence_id,
            step_number: enrollment.current_step_number,
        })?;

    let mut activity = Activity::new(
        enrollment.owner.clone(),
        format!("Sequence: {}", current.step_type),
        current.summary(),
        *now,
    );
    activity.contact_id = Some(enrollment.contact_id);
    activity.account_id = account_id;

    let next = enrollment
        .current_step_number
        .checked_add(1)
        .and_then(|n| sequence::find_step(steps, enrollment.sequence_id, n));
    let patch = match next {
        Some(next) => EnrollmentPatch {
            current_step_number: Some(next.step_number),
            status: None,
            last_completed_date: Some(*now),
            next_step_due_date: Some(clock::add_days(now, next.delay_days)),
        },
        None => EnrollmentPatch {
            status: Some(EnrollmentStatus::Completed),
            ..Default::default()
        },
    };

    Ok(StepCompletion {
        enrollment_id: enrollment.id,
        completed_step: current.step_number,
        patch,
        activity,
    })
}

/// Step back one step (never below 1) and make it due from the start of today.
pub fn revisit_step(enrollment: &ContactSequence, now: &Timestamp) -> Result<EnrollmentPatch> {
    enrollment.require_active(EnrollmentStatus::Active, "revisit")?;
    Ok(EnrollmentPatch {
        current_step_number: Some(enrollment.current_step_number.saturating_sub(1).max(1)),
        status: Some(EnrollmentStatus::Active),
        last_completed_date: None,
        next_step_due_date: Some(clock::start_of_day(now)),
    })
}

pub fn remove_enrollment(enrollment: &ContactSequence) -> Result<EnrollmentPatch> {
    enrollment.require_active(EnrollmentStatus::Removed, "remove")?;
    Ok(EnrollmentPatch {
        status: Some(EnrollmentStatus::Removed),
        ..Default::default()
    })
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

pub fn active_enrollment_for(
    contact_id: RecordId,
    enrollments: &[ContactSequence],
) -> Option<&ContactSequence> {
    enrollments
        .iter()
        .find(|e| e.contact_id == contact_id && e.is_active())
}

/// One row of the "steps due" queue.
#[derive(Debug, Clone, Serialize)]
pub struct DueItem {
    pub enrollment_id: RecordId,
    pub contact_id: RecordId,
    pub sequence_id: RecordId,
    pub sequence_name: Option<String>,
    pub step_number: u32,
    pub step: Option<SequenceStep>,
    pub due: Timestamp,
    /// Whole calendar days past due; 0 when due today.
    pub days_overdue: i64,
}

/// Active enrollments due on or before today, oldest due date first.
///
/// Both the due date and `now` are reduced to calendar days in `now`'s
/// offset before comparing. Enrollments whose sequence or step record is
/// missing stay in the queue with those fields empty.
pub fn compute_due_steps(
    enrollments: &[ContactSequence],
    sequences: &[Sequence],
    steps: &[SequenceStep],
    now: &Timestamp,
) -> Vec<DueItem> {
    let today = now.date_naive();
    let mut due: Vec<&ContactSequence> = enrollments.iter().filter(|e| e.is_due(now)).collect();
    due.sort_by_key(|e| e.next_step_due_date);

    due.into_iter()
        .map(|e| {
            let sequence_name = sequences
                .iter()
                .find(|s| s.id == e.sequence_id)
                .map(|s| s.name.clone());
            let step = sequence::find_step(steps, e.sequence_id, e.current_step_number).cloned();
            if sequence_name.is_none() || step.is_none() {
                tracing::warn!(
                    enrollment = e.id,
                    sequence = e.sequence_id,
                    step = e.current_step_number,
                    "due enrollment references a missing sequence or step"
                );
            }
            let due_day = clock::calendar_day(&e.next_step_due_date, now.offset());
            DueItem {
                enrollment_id: e.id,
                contact_id: e.contact_id,
                sequence_id: e.sequence_id,
                sequence_name,
                step_number: e.current_step_number,
                step,
                due: e.next_step_due_date,
                days_overdue: (today - due_day).num_days(),
            }
        })
        .collect()
}

/// How far an enrollment has come through its sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceProgress {
    pub completed: u32,
    pub total: u32,
    pub percent: f64,
}

pub fn progress(enrollment: &ContactSequence, steps: &[SequenceStep]) -> SequenceProgress {
    let in_sequence = sequence::steps_for(steps, enrollment.sequence_id);
    let total = in_sequence.len() as u32;
    let completed = match enrollment.status {
        EnrollmentStatus::Completed => total,
        _ => in_sequence
            .iter()
            .filter(|s| s.step_number < enrollment.current_step_number)
            .count() as u32,
    };
    let percent = if total > 0 {
        f64::from(completed) / f64::from(total) * 100.0
    } else {
        0.0
    };
    SequenceProgress {
        completed,
        total,
        percent,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
