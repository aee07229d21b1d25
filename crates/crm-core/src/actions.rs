//! Load, compute, persist.
//!
//! Each action reads what it needs from a [`RecordStore`], runs the pure
//! domain function, writes the resulting mutations and re-reads the affected
//! rows. The CLI and the HTTP server both go through here.

use crate::activity::Activity;
use crate::clock::Timestamp;
use crate::config::Config;
use crate::contact::{Account, AccountPatch, Contact, ContactPatch};
use crate::deal::{Deal, DealPatch};
use crate::enrollment::{self, ContactSequence, DueItem};
use crate::error::{CrmError, Result};
use crate::io;
use crate::paths;
use crate::quota::{self, ForecastScope, QuotaSummary};
use crate::sequence::{self, Sequence, SequenceStep};
use crate::store::{Record, RecordStore};
use crate::task::{Task, TaskLink, TaskPatch};
use crate::types::{EnrollmentStatus, RecordId, TaskStatus};
use serde::Serialize;
use std::path::Path;

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

/// Create `.crm/` under `root`. An existing config is left alone and returned.
pub fn init(root: &Path, user_id: &str) -> Result<Config> {
    if user_id.trim().is_empty() {
        return Err(CrmError::validation("a user id is required to initialize"));
    }
    io::ensure_dir(&paths::data_dir(root))?;
    if paths::config_path(root).exists() {
        return Config::load(root);
    }
    let config = Config::new(user_id.trim());
    config.save(root)?;
    tracing::info!(root = %root.display(), user = %config.session.user_id, "initialized crm");
    Ok(config)
}

/// Fetch one row owned by `owner`. Rows of other owners read as not found.
pub fn owned<R: Record, S: RecordStore>(store: &S, owner: &str, id: RecordId) -> Result<R> {
    let record: R = store.get(id)?;
    match record.owner() {
        Some(o) if o != owner => Err(CrmError::NotFound { table: R::TABLE, id }),
        _ => Ok(record),
    }
}

// ---------------------------------------------------------------------------
// Accounts & contacts
// ---------------------------------------------------------------------------

pub fn create_account<S: RecordStore>(store: &mut S, mut account: Account) -> Result<Account> {
    account.name = account.name.trim().to_string();
    account.validate()?;
    store.insert(account)
}

pub fn create_contact<S: RecordStore>(store: &mut S, contact: Contact) -> Result<Contact> {
    contact.validate()?;
    if let Some(account_id) = contact.account_id {
        owned::<Account, _>(store, &contact.owner, account_id)?;
    }
    store.insert(contact)
}

pub fn update_account<S: RecordStore>(
    store: &mut S,
    owner: &str,
    id: RecordId,
    patch: &AccountPatch,
) -> Result<Account> {
    let account: Account = owned(store, owner, id)?;
    patch.check(&account)?;
    store.update::<Account, _>(id, |a| patch.apply(a))?;
    store.get(id)
}

/// Delete an account. Contacts, deals, tasks and activities that pointed at
/// it stay and lose the link.
pub fn delete_account<S: RecordStore>(store: &mut S, owner: &str, id: RecordId) -> Result<()> {
    owned::<Account, _>(store, owner, id)?;
    let linked = Some(id);
    let contacts = detach(store, |c: &Contact| c.account_id == linked, |c: &mut Contact| c.account_id = None)?;
    let deals = detach(store, |d: &Deal| d.account_id == linked, |d: &mut Deal| d.account_id = None)?;
    detach(store, |t: &Task| t.account_id == linked, |t: &mut Task| t.account_id = None)?;
    detach(store, |a: &Activity| a.account_id == linked, |a: &mut Activity| a.account_id = None)?;
    store.delete::<Account>(id)?;
    tracing::info!(account = id, contacts, deals, "deleted account");
    Ok(())
}

pub fn update_contact<S: RecordStore>(
    store: &mut S,
    owner: &str,
    id: RecordId,
    patch: &ContactPatch,
) -> Result<Contact> {
    let contact: Contact = owned(store, owner, id)?;
    patch.check(&contact)?;
    if let Some(Some(account_id)) = patch.account_id {
        owned::<Account, _>(store, owner, account_id)?;
    }
    store.update::<Contact, _>(id, |c| patch.apply(c))?;
    store.get(id)
}

/// Delete a contact with all of its enrollments. Tasks and activities that
/// pointed at it stay and lose the link.
pub fn delete_contact<S: RecordStore>(store: &mut S, owner: &str, id: RecordId) -> Result<()> {
    owned::<Contact, _>(store, owner, id)?;
    let enrollments = store.delete_where::<ContactSequence, _>(|e| e.contact_id == id)?;
    let linked = Some(id);
    detach(store, |t: &Task| t.contact_id == linked, |t: &mut Task| t.contact_id = None)?;
    detach(store, |a: &Activity| a.contact_id == linked, |a: &mut Activity| a.contact_id = None)?;
    store.delete::<Contact>(id)?;
    tracing::info!(contact = id, enrollments, "deleted contact");
    Ok(())
}

/// Apply `clear` to every row matching `pred`. Returns how many rows changed.
fn detach<R, S, P, C>(store: &mut S, pred: P, clear: C) -> Result<usize>
where
    R: Record,
    S: RecordStore,
    P: Fn(&R) -> bool,
    C: Fn(&mut R),
{
    let ids: Vec<RecordId> = store
        .fetch_all::<R>(None)?
        .iter()
        .filter(|r| pred(r))
        .map(Record::id)
        .collect();
    for id in &ids {
        store.update::<R, _>(*id, &clear)?;
    }
    Ok(ids.len())
}

// ---------------------------------------------------------------------------
// Sequences
// ---------------------------------------------------------------------------

pub fn create_sequence<S: RecordStore>(store: &mut S, owner: &str, name: &str) -> Result<Sequence> {
    let seq = Sequence::new(owner, name);
    seq.validate()?;
    store.insert(seq)
}

pub fn rename_sequence<S: RecordStore>(
    store: &mut S,
    owner: &str,
    id: RecordId,
    name: &str,
) -> Result<Sequence> {
    let mut renamed: Sequence = owned(store, owner, id)?;
    renamed.name = name.trim().to_string();
    renamed.validate()?;
    store.update::<Sequence, _>(id, |s| s.name = renamed.name.clone())?;
    store.get(id)
}

/// Append a step to a sequence the caller owns. A `step_number` of 0 is
/// replaced with the next free number.
pub fn add_step<S: RecordStore>(
    store: &mut S,
    owner: &str,
    mut step: SequenceStep,
) -> Result<SequenceStep> {
    owned::<Sequence, _>(store, owner, step.sequence_id)?;
    let steps: Vec<SequenceStep> = store.fetch_all(None)?;
    if step.step_number == 0 {
        step.step_number = sequence::next_step_number(&steps, step.sequence_id)?;
    }
    sequence::validate_new_step(&steps, &step)?;
    store.insert(step)
}

/// Delete a sequence with its steps. Active enrollments in it are marked
/// Removed since their current step no longer exists.
pub fn delete_sequence<S: RecordStore>(store: &mut S, owner: &str, id: RecordId) -> Result<()> {
    owned::<Sequence, _>(store, owner, id)?;
    let active: Vec<RecordId> = store
        .fetch_all::<ContactSequence>(None)?
        .iter()
        .filter(|e| e.sequence_id == id && e.is_active())
        .map(|e| e.id)
        .collect();
    for enrollment_id in &active {
        store.update::<ContactSequence, _>(*enrollment_id, |e| {
            e.status = EnrollmentStatus::Removed;
        })?;
    }
    let steps = store.delete_where::<SequenceStep, _>(|s| s.sequence_id == id)?;
    store.delete::<Sequence>(id)?;
    tracing::info!(sequence = id, steps, enrollments = active.len(), "deleted sequence");
    Ok(())
}

// ---------------------------------------------------------------------------
// Enrollments
// ---------------------------------------------------------------------------

pub fn assign<S: RecordStore>(
    store: &mut S,
    owner: &str,
    contact_id: RecordId,
    sequence_id: RecordId,
    now: &Timestamp,
) -> Result<ContactSequence> {
    owned::<Contact, _>(store, owner, contact_id)?;
    owned::<Sequence, _>(store, owner, sequence_id)?;
    let existing: Vec<ContactSequence> = store.fetch_all(None)?;
    let steps: Vec<SequenceStep> = store.fetch_all(None)?;

    let enrollment =
        enrollment::assign_sequence(owner, contact_id, sequence_id, &existing, &steps, now)?;
    let saved = store.insert(enrollment)?;
    tracing::info!(
        enrollment = saved.id,
        contact = contact_id,
        sequence = sequence_id,
        step = saved.current_step_number,
        "assigned sequence"
    );
    Ok(saved)
}

/// Outcome of completing a step, as persisted.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedStep {
    pub enrollment: ContactSequence,
    pub activity: Activity,
    pub completed_step: u32,
    pub finished: bool,
}

pub fn complete<S: RecordStore>(
    store: &mut S,
    owner: &str,
    enrollment_id: RecordId,
    now: &Timestamp,
) -> Result<CompletedStep> {
    let current: ContactSequence = owned(store, owner, enrollment_id)?;
    let steps: Vec<SequenceStep> = store.fetch_all(None)?;
    let account_id = match store.get::<Contact>(current.contact_id) {
        Ok(contact) => contact.account_id,
        Err(CrmError::NotFound { .. }) => None,
        Err(e) => return Err(e),
    };

    let done = enrollment::complete_step(&current, &steps, account_id, now)?;
    let finished = done.finished();
    // Log first: a failed insert must leave the enrollment where it was.
    let activity = store.insert(done.activity)?;
    store.update::<ContactSequence, _>(enrollment_id, |e| done.patch.apply(e))?;
    tracing::info!(
        enrollment = enrollment_id,
        step = done.completed_step,
        finished,
        "completed sequence step"
    );

    Ok(CompletedStep {
        enrollment: store.get(enrollment_id)?,
        activity,
        completed_step: done.completed_step,
        finished,
    })
}

pub fn revisit<S: RecordStore>(
    store: &mut S,
    owner: &str,
    enrollment_id: RecordId,
    now: &Timestamp,
) -> Result<ContactSequence> {
    let current: ContactSequence = owned(store, owner, enrollment_id)?;
    let patch = enrollment::revisit_step(&current, now)?;
    store.update::<ContactSequence, _>(enrollment_id, |e| patch.apply(e))?;
    tracing::info!(enrollment = enrollment_id, step = ?patch.current_step_number, "revisited step");
    store.get(enrollment_id)
}

pub fn remove<S: RecordStore>(
    store: &mut S,
    owner: &str,
    enrollment_id: RecordId,
) -> Result<ContactSequence> {
    let current: ContactSequence = owned(store, owner, enrollment_id)?;
    let patch = enrollment::remove_enrollment(&current)?;
    store.update::<ContactSequence, _>(enrollment_id, |e| patch.apply(e))?;
    tracing::info!(enrollment = enrollment_id, "removed contact from sequence");
    store.get(enrollment_id)
}

pub fn due<S: RecordStore>(store: &S, owner: &str, now: &Timestamp) -> Result<Vec<DueItem>> {
    let me = Some(owner);
    let enrollments: Vec<ContactSequence> = store.fetch_all(me)?;
    let sequences: Vec<Sequence> = store.fetch_all(me)?;
    let steps: Vec<SequenceStep> = store.fetch_all(None)?;
    Ok(enrollment::compute_due_steps(
        &enrollments,
        &sequences,
        &steps,
        now,
    ))
}

// ---------------------------------------------------------------------------
// Deals & quota
// ---------------------------------------------------------------------------

pub fn create_deal<S: RecordStore>(store: &mut S, deal: Deal) -> Result<Deal> {
    deal.validate()?;
    if let Some(account_id) = deal.account_id {
        owned::<Account, _>(store, &deal.owner, account_id)?;
    }
    store.insert(deal)
}

pub fn update_deal<S: RecordStore>(
    store: &mut S,
    owner: &str,
    id: RecordId,
    patch: &DealPatch,
) -> Result<Deal> {
    let deal: Deal = owned(store, owner, id)?;
    patch.check(&deal)?;
    store.update::<Deal, _>(id, |d| patch.apply(d))?;
    store.get(id)
}

/// Quota summary for the scope the session is actually granted.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaReport {
    pub scope: ForecastScope,
    pub quota: f64,
    #[serde(flatten)]
    pub summary: QuotaSummary,
}

pub fn quota_report<S: RecordStore>(
    store: &S,
    config: &Config,
    requested: ForecastScope,
    now: &Timestamp,
) -> Result<QuotaReport> {
    let session = &config.session;
    let scope = requested.effective(session);
    if scope != requested {
        tracing::debug!(user = %session.user_id, "team forecast needs a manager session; showing own");
    }
    let deals: Vec<Deal> = store.fetch_all(scope.owner_filter(session))?;
    let quota = scope.quota(session, &config.quota);
    Ok(QuotaReport {
        scope,
        quota,
        summary: quota::aggregate_quota(&deals, quota, now),
    })
}

// ---------------------------------------------------------------------------
// Activities & tasks
// ---------------------------------------------------------------------------

pub fn log_activity<S: RecordStore>(store: &mut S, activity: Activity) -> Result<Activity> {
    activity.validate()?;
    if let Some(contact_id) = activity.contact_id {
        owned::<Contact, _>(store, &activity.owner, contact_id)?;
    }
    store.insert(activity)
}

pub fn create_task<S: RecordStore>(store: &mut S, task: Task) -> Result<Task> {
    task.validate()?;
    store.insert(task)
}

/// Edit a task. A new link must point at a record the caller owns.
pub fn update_task<S: RecordStore>(
    store: &mut S,
    owner: &str,
    id: RecordId,
    patch: &TaskPatch,
) -> Result<Task> {
    let task: Task = owned(store, owner, id)?;
    patch.check(&task)?;
    match patch.link {
        Some(TaskLink::Contact(cid)) => {
            owned::<Contact, _>(store, owner, cid)?;
        }
        Some(TaskLink::Account(aid)) => {
            owned::<Account, _>(store, owner, aid)?;
        }
        Some(TaskLink::Deal(did)) => {
            owned::<Deal, _>(store, owner, did)?;
        }
        Some(TaskLink::Unlinked) | None => {}
    }
    store.update::<Task, _>(id, |t| patch.apply(t))?;
    store.get(id)
}

pub fn complete_task<S: RecordStore>(store: &mut S, owner: &str, id: RecordId) -> Result<Task> {
    owned::<Task, _>(store, owner, id)?;
    store.update::<Task, _>(id, |t| t.status = TaskStatus::Completed)?;
    store.get(id)
}

pub fn delete_task<S: RecordStore>(store: &mut S, owner: &str, id: RecordId) -> Result<()> {
    owned::<Task, _>(store, owner, id)?;
    store.delete::<Task>(id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
