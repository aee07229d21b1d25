use super::Globals;
use crate::output::{or_dash, print_json, print_table};
use clap::Subcommand;
use crm_core::actions;
use crm_core::task::{self, Task, TaskLink, TaskPatch};
use crm_core::store::RecordStore;
use crm_core::types::RecordId;

#[derive(Subcommand)]
pub enum TaskSubcommand {
    /// Add a follow-up task
    Add {
        #[arg(required = true)]
        description: Vec<String>,
        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due: Option<chrono::NaiveDate>,
        #[arg(long)]
        contact: Option<RecordId>,
        #[arg(long)]
        deal: Option<RecordId>,
    },
    /// List pending tasks, soonest first
    List,
    /// Change a task's description, due date or linked record
    Edit {
        id: RecordId,
        #[arg(long)]
        description: Option<String>,
        /// New due date, YYYY-MM-DD
        #[arg(long, conflicts_with = "no_due")]
        due: Option<chrono::NaiveDate>,
        /// Clear the due date
        #[arg(long)]
        no_due: bool,
        /// Link to a contact (replaces any other link)
        #[arg(long, group = "link")]
        contact: Option<RecordId>,
        /// Link to an account (replaces any other link)
        #[arg(long, group = "link")]
        account: Option<RecordId>,
        /// Link to a deal (replaces any other link)
        #[arg(long, group = "link")]
        deal: Option<RecordId>,
        /// Remove the task's link
        #[arg(long, group = "link")]
        unlink: bool,
    },
    /// Mark a task done
    Complete { id: RecordId },
    /// Delete a task
    Delete { id: RecordId },
}

pub fn run(g: &Globals, subcmd: TaskSubcommand) -> anyhow::Result<()> {
    match subcmd {
        TaskSubcommand::Add {
            description,
            due,
            contact,
            deal,
        } => add(g, &description.join(" "), due, contact, deal),
        TaskSubcommand::List => list(g),
        TaskSubcommand::Edit {
            id,
            description,
            due,
            no_due,
            contact,
            account,
            deal,
            unlink,
        } => {
            let link = match (contact, account, deal, unlink) {
                (Some(c), _, _, _) => Some(TaskLink::Contact(c)),
                (_, Some(a), _, _) => Some(TaskLink::Account(a)),
                (_, _, Some(d), _) => Some(TaskLink::Deal(d)),
                (_, _, _, true) => Some(TaskLink::Unlinked),
                _ => None,
            };
            let due_date = match (due, no_due) {
                (Some(d), _) => Some(Some(d)),
                (None, true) => Some(None),
                (None, false) => None,
            };
            let patch = TaskPatch {
                description,
                due_date,
                link,
            };
            edit(g, id, &patch)
        }
        TaskSubcommand::Complete { id } => complete(g, id),
        TaskSubcommand::Delete { id } => delete(g, id),
    }
}

fn add(
    g: &Globals,
    description: &str,
    due: Option<chrono::NaiveDate>,
    contact: Option<RecordId>,
    deal: Option<RecordId>,
) -> anyhow::Result<()> {
    let mut s = g.session()?;
    let mut t = Task::new(s.owner.as_str(), description);
    t.due_date = due;
    t.contact_id = contact;
    t.deal_id = deal;
    let t = actions::create_task(&mut s.store, t)?;
    if g.json {
        print_json(&t)?;
    } else {
        println!("Added task [{}]: {}", t.id, t.description);
    }
    Ok(())
}

fn list(g: &Globals) -> anyhow::Result<()> {
    let s = g.session()?;
    let all: Vec<Task> = s.store.fetch_all(Some(s.owner.as_str()))?;
    let pending = task::pending_tasks(&all);
    let today = s.now.date_naive();
    if g.json {
        return print_json(&pending);
    }
    if pending.is_empty() {
        println!("No pending tasks. ({})", task::summarize(&all, today));
        return Ok(());
    }
    let rows = pending
        .iter()
        .map(|t| {
            let mut due = or_dash(t.due_date.map(|d| d.to_string()));
            if t.is_overdue(today) {
                due.push_str(" (overdue)");
            }
            vec![t.id.to_string(), due, t.description.clone()]
        })
        .collect();
    print_table(&["ID", "DUE", "TASK"], rows);
    println!("\n{}", task::summarize(&all, today));
    Ok(())
}

fn edit(g: &Globals, id: RecordId, patch: &TaskPatch) -> anyhow::Result<()> {
    let mut s = g.session()?;
    let t = actions::update_task(&mut s.store, &s.owner, id, patch)?;
    if g.json {
        print_json(&t)?;
    } else {
        println!("Updated task [{}]: {}", t.id, t.description);
    }
    Ok(())
}

fn complete(g: &Globals, id: RecordId) -> anyhow::Result<()> {
    let mut s = g.session()?;
    let t = actions::complete_task(&mut s.store, &s.owner, id)?;
    if g.json {
        print_json(&t)?;
    } else {
        println!("Completed task [{}]", t.id);
    }
    Ok(())
}

fn delete(g: &Globals, id: RecordId) -> anyhow::Result<()> {
    let mut s = g.session()?;
    actions::delete_task(&mut s.store, &s.owner, id)?;
    if g.json {
        print_json(&serde_json::json!({ "id": id, "deleted": true }))?;
    } else {
        println!("Deleted task [{id}]");
    }
    Ok(())
}
