use super::Globals;
use crate::output::{or_dash, print_json, print_table};
use clap::{Args, Subcommand};
use crm_core::actions;
use crm_core::contact::{Account, AccountPatch, Contact};
use crm_core::store::RecordStore;
use crm_core::types::RecordId;

#[derive(Subcommand)]
pub enum AccountSubcommand {
    /// Create an account
    Add {
        #[arg(required = true)]
        name: Vec<String>,
        #[command(flatten)]
        fields: AccountFields,
    },
    /// List accounts with their contact counts
    List,
    /// Change fields on an account
    Update {
        id: RecordId,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: AccountFields,
    },
    /// Delete an account; its contacts and deals are kept but unlinked
    Delete { id: RecordId },
}

#[derive(Args)]
pub struct AccountFields {
    #[arg(long)]
    website: Option<String>,
    #[arg(long)]
    industry: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

impl AccountFields {
    fn into_patch(self, name: Option<String>) -> AccountPatch {
        AccountPatch {
            name,
            website: self.website,
            industry: self.industry,
            phone: self.phone,
            address: self.address,
            notes: self.notes,
        }
    }
}

pub fn run(g: &Globals, subcmd: AccountSubcommand) -> anyhow::Result<()> {
    match subcmd {
        AccountSubcommand::Add { name, fields } => add(g, &name.join(" "), fields),
        AccountSubcommand::List => list(g),
        AccountSubcommand::Update { id, name, fields } => update(g, id, fields.into_patch(name)),
        AccountSubcommand::Delete { id } => delete(g, id),
    }
}

fn add(g: &Globals, name: &str, fields: AccountFields) -> anyhow::Result<()> {
    let mut s = g.session()?;
    let mut account = Account::new(s.owner.as_str(), name);
    fields.into_patch(None).apply(&mut account);
    let account = actions::create_account(&mut s.store, account)?;
    if g.json {
        print_json(&account)?;
    } else {
        println!("Created account [{}]: {}", account.id, account.name);
    }
    Ok(())
}

fn list(g: &Globals) -> anyhow::Result<()> {
    let s = g.session()?;
    let accounts: Vec<Account> = s.store.fetch_all(Some(s.owner.as_str()))?;
    if g.json {
        return print_json(&accounts);
    }
    if accounts.is_empty() {
        println!("No accounts.");
        return Ok(());
    }
    let contacts: Vec<Contact> = s.store.fetch_all(Some(s.owner.as_str()))?;
    let rows = accounts
        .iter()
        .map(|a| {
            let n = contacts
                .iter()
                .filter(|c| c.account_id == Some(a.id))
                .count();
            vec![
                a.id.to_string(),
                a.name.clone(),
                or_dash(Some(a.industry.clone()).filter(|i| !i.is_empty())),
                or_dash(Some(a.website.clone()).filter(|w| !w.is_empty())),
                n.to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "INDUSTRY", "WEBSITE", "CONTACTS"], rows);
    Ok(())
}

fn update(g: &Globals, id: RecordId, patch: AccountPatch) -> anyhow::Result<()> {
    let mut s = g.session()?;
    let account = actions::update_account(&mut s.store, &s.owner, id, &patch)?;
    if g.json {
        print_json(&account)?;
    } else {
        println!("Updated account [{}]: {}", account.id, account.name);
    }
    Ok(())
}

fn delete(g: &Globals, id: RecordId) -> anyhow::Result<()> {
    let mut s = g.session()?;
    actions::delete_account(&mut s.store, &s.owner, id)?;
    if g.json {
        print_json(&serde_json::json!({ "id": id, "deleted": true }))?;
    } else {
        println!("Deleted account [{id}]");
    }
    Ok(())
}
