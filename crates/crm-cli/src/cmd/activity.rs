use super::Globals;
use crate::output::{print_json, print_table};
use clap::Subcommand;
use crm_core::actions;
use crm_core::activity::{self, Activity};
use crm_core::contact::Contact;
use crm_core::store::RecordStore;
use crm_core::types::RecordId;

#[derive(Subcommand)]
pub enum ActivitySubcommand {
    /// Record a touch that happened outside a sequence
    Log {
        /// Call, Email, Meeting, ...
        activity_type: String,
        #[arg(required = true)]
        description: Vec<String>,
        #[arg(long)]
        contact: Option<RecordId>,
    },
    /// Newest activities first
    Recent {
        /// Defaults to dashboard.recent_activity_limit
        #[arg(long)]
        limit: Option<usize>,
    },
}

pub fn run(g: &Globals, subcmd: ActivitySubcommand) -> anyhow::Result<()> {
    match subcmd {
        ActivitySubcommand::Log {
            activity_type,
            description,
            contact,
        } => log(g, &activity_type, &description.join(" "), contact),
        ActivitySubcommand::Recent { limit } => recent(g, limit),
    }
}

fn log(
    g: &Globals,
    activity_type: &str,
    description: &str,
    contact_id: Option<RecordId>,
) -> anyhow::Result<()> {
    let mut s = g.session()?;
    let mut a = Activity::new(s.owner.as_str(), activity_type.trim(), description, s.now);
    if let Some(id) = contact_id {
        let contact: Contact = actions::owned(&s.store, &s.owner, id)?;
        a.contact_id = Some(id);
        a.account_id = contact.account_id;
    }
    let a = actions::log_activity(&mut s.store, a)?;
    if g.json {
        print_json(&a)?;
    } else {
        println!("Logged {} [{}]", a.activity_type, a.id);
    }
    Ok(())
}

fn recent(g: &Globals, limit: Option<usize>) -> anyhow::Result<()> {
    let s = g.session()?;
    let all: Vec<Activity> = s.store.fetch_all(Some(s.owner.as_str()))?;
    let limit = limit.unwrap_or(s.config.dashboard.recent_activity_limit);
    let recent = activity::recent_activities(&all, limit);
    if g.json {
        return print_json(&recent);
    }
    if recent.is_empty() {
        println!("No activity yet.");
        return Ok(());
    }
    let rows = recent
        .iter()
        .map(|a| {
            vec![
                a.date.format("%Y-%m-%d %H:%M").to_string(),
                a.activity_type.clone(),
                a.description.clone(),
            ]
        })
        .collect();
    print_table(&["DATE", "TYPE", "DESCRIPTION"], rows);
    Ok(())
}
