use super::Globals;
use crate::output::{print_json, print_table};
use clap::Subcommand;
use crm_core::actions;
use crm_core::enrollment;
use crm_core::snapshot::Snapshot;
use crm_core::types::RecordId;

#[derive(Subcommand)]
pub enum EnrollSubcommand {
    /// Start a contact on a sequence
    Assign {
        contact_id: RecordId,
        sequence_id: RecordId,
    },
    /// List enrollments
    List {
        /// Include completed and removed enrollments
        #[arg(long)]
        all: bool,
    },
    /// Complete the current step and schedule the next one
    Complete { id: RecordId },
    /// Go back one step, due today
    Revisit { id: RecordId },
    /// Take the contact out of the sequence
    Remove { id: RecordId },
}

pub fn run(g: &Globals, subcmd: EnrollSubcommand) -> anyhow::Result<()> {
    match subcmd {
        EnrollSubcommand::Assign {
            contact_id,
            sequence_id,
        } => assign(g, contact_id, sequence_id),
        EnrollSubcommand::List { all } => list(g, all),
        EnrollSubcommand::Complete { id } => complete(g, id),
        EnrollSubcommand::Revisit { id } => revisit(g, id),
        EnrollSubcommand::Remove { id } => remove(g, id),
    }
}

fn assign(g: &Globals, contact_id: RecordId, sequence_id: RecordId) -> anyhow::Result<()> {
    let mut s = g.session()?;
    let e = actions::assign(&mut s.store, &s.owner, contact_id, sequence_id, &s.now)?;
    if g.json {
        print_json(&e)?;
    } else {
        println!(
            "Enrolled contact {contact_id} in sequence {sequence_id} [{}]: step {} due {}",
            e.id,
            e.current_step_number,
            e.next_step_due_date.format("%Y-%m-%d")
        );
    }
    Ok(())
}

fn list(g: &Globals, all: bool) -> anyhow::Result<()> {
    let s = g.session()?;
    let snap = Snapshot::load(&s.store, &s.owner)?;
    let shown: Vec<_> = snap
        .enrollments
        .iter()
        .filter(|e| all || e.is_active())
        .collect();
    if g.json {
        return print_json(&shown);
    }
    if shown.is_empty() {
        println!("No enrollments.");
        return Ok(());
    }
    let rows = shown
        .iter()
        .map(|e| {
            let p = enrollment::progress(e, &snap.steps);
            vec![
                e.id.to_string(),
                snap.contact(e.contact_id)
                    .map_or_else(|| format!("#{}", e.contact_id), |c| c.full_name()),
                snap.sequence(e.sequence_id)
                    .map_or_else(|| format!("#{}", e.sequence_id), |q| q.name.clone()),
                e.status.to_string(),
                format!("{}/{}", p.completed, p.total),
                e.next_step_due_date.format("%Y-%m-%d").to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "CONTACT", "SEQUENCE", "STATUS", "DONE", "DUE"], rows);
    Ok(())
}

fn complete(g: &Globals, id: RecordId) -> anyhow::Result<()> {
    let mut s = g.session()?;
    let done = actions::complete(&mut s.store, &s.owner, id, &s.now)?;
    if g.json {
        print_json(&done)?;
    } else if done.finished {
        println!(
            "Completed step {} ({}); sequence finished",
            done.completed_step, done.activity.description
        );
    } else {
        println!(
            "Completed step {} ({}); step {} due {}",
            done.completed_step,
            done.activity.description,
            done.enrollment.current_step_number,
            done.enrollment.next_step_due_date.format("%Y-%m-%d")
        );
    }
    Ok(())
}

fn revisit(g: &Globals, id: RecordId) -> anyhow::Result<()> {
    let mut s = g.session()?;
    let e = actions::revisit(&mut s.store, &s.owner, id, &s.now)?;
    if g.json {
        print_json(&e)?;
    } else {
        println!("Enrollment {id} back on step {}, due today", e.current_step_number);
    }
    Ok(())
}

fn remove(g: &Globals, id: RecordId) -> anyhow::Result<()> {
    let mut s = g.session()?;
    let e = actions::remove(&mut s.store, &s.owner, id)?;
    if g.json {
        print_json(&e)?;
    } else {
        println!("Removed contact {} from sequence {}", e.contact_id, e.sequence_id);
    }
    Ok(())
}
