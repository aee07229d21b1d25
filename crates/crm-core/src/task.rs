use crate::error::{CrmError, Result};
use crate::store::{Record, Table};
use crate::types::{RecordId, TaskStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: RecordId,
    pub owner: String,
    pub description: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    #[serde(default)]
    pub contact_id: Option<RecordId>,
    #[serde(default)]
    pub account_id: Option<RecordId>,
    #[serde(default)]
    pub deal_id: Option<RecordId>,
}

impl Task {
    pub fn new(owner: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: 0,
            owner: owner.into(),
            description: description.into().trim().to_string(),
            due_date: None,
            status: TaskStatus::Pending,
            contact_id: None,
            account_id: None,
            deal_id: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(CrmError::validation("task description is required"));
        }
        Ok(())
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == TaskStatus::Pending && self.due_date.is_some_and(|d| d < today)
    }
}

impl Record for Task {
    const TABLE: Table = Table::Tasks;

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
// Task list queries
// ---------------------------------------------------------------------------

/// Pending tasks, soonest due first; undated tasks sort last.
pub fn pending_tasks(tasks: &[Task]) -> Vec<&Task> {
    let mut pending: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Pending)
        .collect();
    pending.sort_by_key(|t| (t.due_date.is_none(), t.due_date, t.id));
    pending
}

/// Human-readable summary: "2/5 completed, 1 overdue"
pub fn summarize(tasks: &[Task], today: NaiveDate) -> String {
    let total = tasks.len();
    let done = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();
    let overdue = tasks.iter().filter(|t| t.is_overdue(today)).count();
    format!("{done}/{total} completed, {overdue} overdue")
}

// ---------------------------------------------------------------------------
// Edits
// ---------------------------------------------------------------------------

/// The single record a task is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum TaskLink {
    Unlinked,
    Contact(RecordId),
    Account(RecordId),
    Deal(RecordId),
}

/// Partial edit of a task. Setting `link` replaces whatever the task was
/// attached to; `due_date: Some(None)` clears the due date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub link: Option<TaskLink>,
}

impl TaskPatch {
    pub fn check(&self, task: &Task) -> Result<()> {
        let mut preview = task.clone();
        self.apply(&mut preview);
        preview.validate()
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(description) = &self.description {
            task.description = description.trim().to_string();
        }
        if let Some(due) = self.due_date {
            task.due_date = due;
        }
        if let Some(link) = self.link {
            task.contact_id = None;
            task.account_id = None;
            task.deal_id = None;
            match link {
                TaskLink::Unlinked => {}
                TaskLink::Contact(id) => task.contact_id = Some(id),
                TaskLink::Account(id) => task.account_id = Some(id),
                TaskLink::Deal(id) => task.deal_id = Some(id),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, d).unwrap()
    }

    fn task(id: RecordId, due: Option<NaiveDate>) -> Task {
        let mut t = Task::new("u", format!("task {id}"));
        t.id = id;
        t.due_date = due;
        t
    }

    #[test]
    fn pending_sorted_by_due_with_undated_last() {
        let mut done = task(4, Some(day(1)));
        done.status = TaskStatus::Completed;
        let tasks = vec![task(1, None), task(2, Some(day(9))), task(3, Some(day(2))), done];
        let ids: Vec<RecordId> = pending_tasks(&tasks).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn overdue_only_when_pending_and_past() {
        let t = task(1, Some(day(2)));
        assert!(t.is_overdue(day(3)));
        assert!(!t.is_overdue(day(2)));
        let mut done = t.clone();
        done.status = TaskStatus::Completed;
        assert!(!done.is_overdue(day(3)));
    }

    #[test]
    fn summarize_counts() {
        let mut done = task(2, None);
        done.status = TaskStatus::Completed;
        let tasks = vec![task(1, Some(day(1))), done];
        assert_eq!(summarize(&tasks, day(5)), "1/2 completed, 1 overdue");
    }

    #[test]
    fn patch_relinks_and_clears_due_date() {
        let mut t = task(1, Some(day(4)));
        t.contact_id = Some(9);
        let patch = TaskPatch {
            description: Some(" Call back ".into()),
            due_date: Some(None),
            link: Some(TaskLink::Deal(3)),
        };
        patch.apply(&mut t);
        assert_eq!(t.description, "Call back");
        assert_eq!(t.due_date, None);
        assert_eq!(t.contact_id, None);
        assert_eq!(t.deal_id, Some(3));

        let blank = TaskPatch {
            description: Some("".into()),
            ..Default::default()
        };
        assert!(blank.check(&t).is_err());
    }

    #[test]
    fn blank_description_is_invalid() {
        assert!(Task::new("u", "  ").validate().is_err());
    }
}
