use super::Globals;
use crate::output::{money, or_dash, print_json, print_table};
use clap::{Args, Subcommand};
use crm_core::actions;
use crm_core::deal::{self, Deal, DealPatch};
use crm_core::store::RecordStore;
use crm_core::types::{DealStage, RecordId};

#[derive(Subcommand)]
pub enum DealSubcommand {
    /// Create a deal
    Add {
        name: String,
        /// Monthly recurring charge, e.g. 1,250 or $900
        #[arg(long, value_parser = deal::parse_mrc)]
        mrc: f64,
        #[command(flatten)]
        fields: DealFields,
        #[arg(long)]
        account: Option<RecordId>,
    },
    /// List deals
    List,
    /// Change fields on a deal
    Update {
        id: RecordId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_parser = deal::parse_mrc)]
        mrc: Option<f64>,
        #[command(flatten)]
        fields: DealFields,
        /// Drop the commit flag
        #[arg(long, conflicts_with = "committed")]
        uncommit: bool,
    },
    /// Count open deals per stage
    Pipeline,
}

#[derive(Args)]
pub struct DealFields {
    /// Discovery, Proposal, Negotiation, "Closed Won" or "Closed Lost"
    #[arg(long)]
    stage: Option<DealStage>,
    /// Expected close month, YYYY-MM
    #[arg(long, value_parser = deal::parse_close_month)]
    close: Option<chrono::NaiveDate>,
    /// Count toward this month's commit
    #[arg(long)]
    committed: bool,
    #[arg(long)]
    term: Option<String>,
    #[arg(long)]
    products: Option<String>,
}

pub fn run(g: &Globals, subcmd: DealSubcommand) -> anyhow::Result<()> {
    match subcmd {
        DealSubcommand::Add {
            name,
            mrc,
            fields,
            account,
        } => add(g, &name, mrc, fields, account),
        DealSubcommand::List => list(g),
        DealSubcommand::Update {
            id,
            name,
            mrc,
            fields,
            uncommit,
        } => {
            let committed = match (fields.committed, uncommit) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let patch = DealPatch {
                name,
                stage: fields.stage,
                mrc,
                close_month: fields.close,
                is_committed: committed,
                term: fields.term,
                products: fields.products,
            };
            update(g, id, &patch)
        }
        DealSubcommand::Pipeline => pipeline(g),
    }
}

fn add(
    g: &Globals,
    name: &str,
    mrc: f64,
    fields: DealFields,
    account: Option<RecordId>,
) -> anyhow::Result<()> {
    let mut s = g.session()?;
    let mut d = Deal::new(s.owner.as_str(), name, mrc);
    d.account_id = account;
    d.stage = fields.stage.unwrap_or_default();
    d.close_month = fields.close;
    d.is_committed = fields.committed;
    d.term = fields.term.unwrap_or_default();
    d.products = fields.products.unwrap_or_default();
    let d = actions::create_deal(&mut s.store, d)?;
    if g.json {
        print_json(&d)?;
    } else {
        println!("Created deal [{}]: {} {}/mo", d.id, d.name, money(d.mrc));
    }
    Ok(())
}

fn list(g: &Globals) -> anyhow::Result<()> {
    let s = g.session()?;
    let deals: Vec<Deal> = s.store.fetch_all(Some(s.owner.as_str()))?;
    if g.json {
        return print_json(&deals);
    }
    if deals.is_empty() {
        println!("No deals.");
        return Ok(());
    }
    let rows = deals
        .iter()
        .map(|d| {
            vec![
                d.id.to_string(),
                d.name.clone(),
                d.stage.to_string(),
                money(d.mrc),
                or_dash(d.close_month.map(|m| m.format("%Y-%m").to_string())),
                if d.is_committed { "yes" } else { "" }.to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "STAGE", "MRC", "CLOSE", "COMMIT"], rows);
    Ok(())
}

fn update(g: &Globals, id: RecordId, patch: &DealPatch) -> anyhow::Result<()> {
    let mut s = g.session()?;
    let d = actions::update_deal(&mut s.store, &s.owner, id, patch)?;
    if g.json {
        print_json(&d)?;
    } else {
        println!("Updated deal [{}]: {} ({})", d.id, d.name, d.stage);
    }
    Ok(())
}

fn pipeline(g: &Globals) -> anyhow::Result<()> {
    let s = g.session()?;
    let deals: Vec<Deal> = s.store.fetch_all(Some(s.owner.as_str()))?;
    let counts = deal::open_deals_by_stage(&deals);
    if g.json {
        let map: serde_json::Map<String, serde_json::Value> = counts
            .iter()
            .map(|(stage, n)| (stage.to_string(), (*n).into()))
            .collect();
        return print_json(&map);
    }
    if counts.is_empty() {
        println!("No open deals.");
        return Ok(());
    }
    let rows = counts
        .iter()
        .map(|(stage, n)| vec![stage.to_string(), n.to_string()])
        .collect();
    print_table(&["STAGE", "OPEN"], rows);
    Ok(())
}
