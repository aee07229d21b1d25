use super::Globals;
use crate::output::{or_dash, print_json, print_table};
use anyhow::Context;
use clap::{Args, Subcommand};
use crm_core::actions;
use crm_core::activity;
use crm_core::contact::{Contact, ContactPatch};
use crm_core::enrollment;
use crm_core::snapshot::Snapshot;
use crm_core::store::RecordStore;
use crm_core::types::RecordId;

#[derive(Subcommand)]
pub enum ContactSubcommand {
    /// Create a contact
    Add {
        first_name: String,
        #[arg(default_value = "")]
        last_name: String,
        #[arg(long)]
        email: Option<String>,
        /// Account id the contact works at
        #[arg(long)]
        account: Option<RecordId>,
        #[command(flatten)]
        fields: ContactFields,
    },
    /// List contacts
    List,
    /// Show a contact with its sequence progress and activity history
    Show { id: RecordId },
    /// Change fields on a contact
    Update {
        id: RecordId,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        /// New address; an empty value clears it
        #[arg(long)]
        email: Option<String>,
        #[arg(long, conflicts_with = "no_account")]
        account: Option<RecordId>,
        /// Detach the contact from its account
        #[arg(long)]
        no_account: bool,
        #[command(flatten)]
        fields: ContactFields,
    },
    /// Delete a contact and its enrollments
    Delete { id: RecordId },
}

#[derive(Args)]
pub struct ContactFields {
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

pub fn run(g: &Globals, subcmd: ContactSubcommand) -> anyhow::Result<()> {
    match subcmd {
        ContactSubcommand::Add {
            first_name,
            last_name,
            email,
            account,
            fields,
        } => add(g, &first_name, &last_name, email, account, fields),
        ContactSubcommand::List => list(g),
        ContactSubcommand::Show { id } => show(g, id),
        ContactSubcommand::Update {
            id,
            first_name,
            last_name,
            email,
            account,
            no_account,
            fields,
        } => {
            let account_id = match (account, no_account) {
                (Some(a), _) => Some(Some(a)),
                (None, true) => Some(None),
                (None, false) => None,
            };
            let patch = ContactPatch {
                first_name,
                last_name,
                email,
                phone: fields.phone,
                title: fields.title,
                notes: fields.notes,
                account_id,
            };
            update(g, id, &patch)
        }
        ContactSubcommand::Delete { id } => delete(g, id),
    }
}

fn add(
    g: &Globals,
    first_name: &str,
    last_name: &str,
    email: Option<String>,
    account: Option<RecordId>,
    fields: ContactFields,
) -> anyhow::Result<()> {
    let mut s = g.session()?;
    let mut contact = Contact::new(s.owner.as_str(), first_name, last_name);
    contact.email = email;
    contact.account_id = account;
    contact.phone = fields.phone.unwrap_or_default();
    contact.title = fields.title.unwrap_or_default();
    contact.notes = fields.notes.unwrap_or_default();
    let contact = actions::create_contact(&mut s.store, contact)?;
    if g.json {
        print_json(&contact)?;
    } else {
        println!("Created contact [{}]: {}", contact.id, contact.full_name());
    }
    Ok(())
}

fn list(g: &Globals) -> anyhow::Result<()> {
    let s = g.session()?;
    let snap = Snapshot::load(&s.store, &s.owner)?;
    if g.json {
        return print_json(&snap.contacts);
    }
    if snap.contacts.is_empty() {
        println!("No contacts.");
        return Ok(());
    }
    let rows = snap
        .contacts
        .iter()
        .map(|c| {
            let sequence = enrollment::active_enrollment_for(c.id, &snap.enrollments)
                .and_then(|e| snap.sequence(e.sequence_id))
                .map(|seq| seq.name.clone());
            vec![
                c.id.to_string(),
                c.full_name(),
                or_dash(c.email_address().map(str::to_string)),
                or_dash(c.account_id.and_then(|id| snap.account(id)).map(|a| a.name.clone())),
                or_dash(sequence),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "EMAIL", "ACCOUNT", "SEQUENCE"], rows);
    Ok(())
}

fn update(g: &Globals, id: RecordId, patch: &ContactPatch) -> anyhow::Result<()> {
    let mut s = g.session()?;
    let contact = actions::update_contact(&mut s.store, &s.owner, id, patch)?;
    if g.json {
        print_json(&contact)?;
    } else {
        println!("Updated contact [{}]: {}", contact.id, contact.full_name());
    }
    Ok(())
}

fn delete(g: &Globals, id: RecordId) -> anyhow::Result<()> {
    let mut s = g.session()?;
    actions::delete_contact(&mut s.store, &s.owner, id)?;
    if g.json {
        print_json(&serde_json::json!({ "id": id, "deleted": true }))?;
    } else {
        println!("Deleted contact [{id}]");
    }
    Ok(())
}

fn show(g: &Globals, id: RecordId) -> anyhow::Result<()> {
    let s = g.session()?;
    let contact: Contact = actions::owned(&s.store, &s.owner, id)
        .with_context(|| format!("contact {id} not found"))?;
    let snap = Snapshot::load(&s.store, &s.owner)?;
    let active = enrollment::active_enrollment_for(id, &snap.enrollments);
    let progress = active.map(|e| enrollment::progress(e, &snap.steps));
    let history = activity::for_contact(&snap.activities, id);

    if g.json {
        return print_json(&serde_json::json!({
            "contact": contact,
            "enrollment": active,
            "progress": progress,
            "activities": history,
        }));
    }

    println!("[{}] {}", contact.id, contact.full_name());
    if let Some(email) = contact.email_address() {
        println!("  email:   {email}");
    }
    if !contact.title.is_empty() {
        println!("  title:   {}", contact.title);
    }
    if !contact.phone.is_empty() {
        println!("  phone:   {}", contact.phone);
    }
    if let Some(account) = contact.account_id.and_then(|a| snap.account(a)) {
        println!("  account: {}", account.name);
    }
    match (active, progress) {
        (Some(e), Some(p)) => {
            let name = snap
                .sequence(e.sequence_id)
                .map_or("(deleted sequence)", |s| s.name.as_str());
            println!(
                "  sequence: {name}, step {} ({}/{} done, {:.0}%), next due {}",
                e.current_step_number,
                p.completed,
                p.total,
                p.percent,
                e.next_step_due_date.format("%Y-%m-%d")
            );
        }
        _ => println!("  sequence: none"),
    }
    if !history.is_empty() {
        println!();
        let rows = history
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
    }
    Ok(())
}
