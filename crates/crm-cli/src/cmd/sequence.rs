use super::Globals;
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use crm_core::actions;
use crm_core::contact::Contact;
use crm_core::sequence::{self, Sequence, SequenceStep};
use crm_core::store::RecordStore;
use crm_core::types::{RecordId, StepType};

#[derive(Subcommand)]
pub enum SequenceSubcommand {
    /// Create an empty sequence
    Create {
        #[arg(required = true)]
        name: Vec<String>,
    },
    /// List sequences
    List,
    /// Show a sequence's steps in order
    Show { id: RecordId },
    /// Append a step to a sequence
    AddStep {
        sequence_id: RecordId,
        /// email, call, linkedin or other
        #[arg(long = "type", default_value = "email")]
        step_type: StepType,
        #[arg(long, default_value = "")]
        subject: String,
        /// Body text; `{{firstName}}` is filled in per contact
        #[arg(long, default_value = "")]
        message: String,
        /// Days after the previous step
        #[arg(long, default_value = "0")]
        delay: u32,
        /// Explicit step number (default: next free number)
        #[arg(long)]
        number: Option<u32>,
    },
    /// Rename a sequence
    Rename {
        id: RecordId,
        #[arg(required = true)]
        name: Vec<String>,
    },
    /// Delete a sequence and its steps
    Delete { id: RecordId },
    /// Render a sequence's messages for one contact
    Preview {
        id: RecordId,
        #[arg(long)]
        contact: RecordId,
    },
}

pub fn run(g: &Globals, subcmd: SequenceSubcommand) -> anyhow::Result<()> {
    match subcmd {
        SequenceSubcommand::Create { name } => create(g, &name.join(" ")),
        SequenceSubcommand::List => list(g),
        SequenceSubcommand::Show { id } => show(g, id),
        SequenceSubcommand::AddStep {
            sequence_id,
            step_type,
            subject,
            message,
            delay,
            number,
        } => {
            let mut step = SequenceStep::new(sequence_id, number.unwrap_or(0), step_type, delay);
            step.subject = subject;
            step.message = message;
            add_step(g, step)
        }
        SequenceSubcommand::Rename { id, name } => rename(g, id, &name.join(" ")),
        SequenceSubcommand::Delete { id } => delete(g, id),
        SequenceSubcommand::Preview { id, contact } => preview(g, id, contact),
    }
}

fn create(g: &Globals, name: &str) -> anyhow::Result<()> {
    let mut s = g.session()?;
    let seq = actions::create_sequence(&mut s.store, &s.owner, name)?;
    if g.json {
        print_json(&seq)?;
    } else {
        println!("Created sequence [{}]: {}", seq.id, seq.name);
    }
    Ok(())
}

fn list(g: &Globals) -> anyhow::Result<()> {
    let s = g.session()?;
    let sequences: Vec<Sequence> = s.store.fetch_all(Some(s.owner.as_str()))?;
    if g.json {
        return print_json(&sequences);
    }
    if sequences.is_empty() {
        println!("No sequences.");
        return Ok(());
    }
    let steps: Vec<SequenceStep> = s.store.fetch_all(None)?;
    let rows = sequences
        .iter()
        .map(|seq| {
            let n = sequence::steps_for(&steps, seq.id).len();
            vec![seq.id.to_string(), seq.name.clone(), n.to_string()]
        })
        .collect();
    print_table(&["ID", "NAME", "STEPS"], rows);
    Ok(())
}

fn show(g: &Globals, id: RecordId) -> anyhow::Result<()> {
    let s = g.session()?;
    let seq: Sequence = actions::owned(&s.store, &s.owner, id)
        .with_context(|| format!("sequence {id} not found"))?;
    let all: Vec<SequenceStep> = s.store.fetch_all(None)?;
    let steps = sequence::steps_for(&all, id);
    if g.json {
        return print_json(&serde_json::json!({ "sequence": seq, "steps": steps }));
    }
    println!("[{}] {}", seq.id, seq.name);
    if steps.is_empty() {
        println!("No steps. Add one with `crm sequence add-step {id}`.");
        return Ok(());
    }
    let rows = steps
        .iter()
        .map(|st| {
            vec![
                st.step_number.to_string(),
                st.step_type.to_string(),
                format!("+{}d", st.delay_days),
                st.summary().to_string(),
            ]
        })
        .collect();
    print_table(&["STEP", "TYPE", "DELAY", "SUBJECT"], rows);
    Ok(())
}

fn add_step(g: &Globals, step: SequenceStep) -> anyhow::Result<()> {
    let mut s = g.session()?;
    let step = actions::add_step(&mut s.store, &s.owner, step)?;
    if g.json {
        print_json(&step)?;
    } else {
        println!(
            "Added step {} ({}) to sequence {}",
            step.step_number, step.step_type, step.sequence_id
        );
    }
    Ok(())
}

fn rename(g: &Globals, id: RecordId, name: &str) -> anyhow::Result<()> {
    let mut s = g.session()?;
    let seq = actions::rename_sequence(&mut s.store, &s.owner, id, name)?;
    if g.json {
        print_json(&seq)?;
    } else {
        println!("Renamed sequence [{}]: {}", seq.id, seq.name);
    }
    Ok(())
}

fn delete(g: &Globals, id: RecordId) -> anyhow::Result<()> {
    let mut s = g.session()?;
    actions::delete_sequence(&mut s.store, &s.owner, id)?;
    if g.json {
        print_json(&serde_json::json!({ "id": id, "deleted": true }))?;
    } else {
        println!("Deleted sequence {id}");
    }
    Ok(())
}

fn preview(g: &Globals, id: RecordId, contact_id: RecordId) -> anyhow::Result<()> {
    let s = g.session()?;
    actions::owned::<Sequence, _>(&s.store, &s.owner, id)
        .with_context(|| format!("sequence {id} not found"))?;
    let contact: Contact = actions::owned(&s.store, &s.owner, contact_id)
        .with_context(|| format!("contact {contact_id} not found"))?;
    let all: Vec<SequenceStep> = s.store.fetch_all(None)?;
    let rendered: Vec<serde_json::Value> = sequence::steps_for(&all, id)
        .into_iter()
        .map(|st| {
            serde_json::json!({
                "step_number": st.step_number,
                "type": st.step_type,
                "subject": sequence::personalize(&st.subject, &contact),
                "message": sequence::personalize(&st.message, &contact),
                "action": st.action_hint(Some(&contact)),
            })
        })
        .collect();
    if g.json {
        return print_json(&rendered);
    }
    for r in &rendered {
        println!(
            "Step {} [{}] {}",
            r["step_number"],
            r["type"].as_str().unwrap_or_default(),
            r["subject"].as_str().unwrap_or_default()
        );
        if let Some(msg) = r["message"].as_str().filter(|m| !m.is_empty()) {
            println!("    {msg}");
        }
    }
    Ok(())
}
