use super::Globals;
use crate::output::{print_json, print_table};
use crm_core::sequence;
use crm_core::snapshot::Snapshot;

/// Show the steps due today or earlier, oldest first.
pub fn run(g: &Globals) -> anyhow::Result<()> {
    let s = g.session()?;
    let snap = Snapshot::load(&s.store, &s.owner)?;
    let due = snap.due_steps(&s.now);

    if g.json {
        return print_json(&due);
    }
    if due.is_empty() {
        println!("Nothing due.");
        return Ok(());
    }

    let rows = due
        .iter()
        .map(|d| {
            let contact = snap.contact(d.contact_id);
            let (kind, what, action) = match &d.step {
                Some(st) => (
                    st.step_type.to_string(),
                    contact.map_or_else(
                        || st.summary().to_string(),
                        |c| sequence::personalize(st.summary(), c),
                    ),
                    st.action_hint(contact),
                ),
                None => ("?".to_string(), "(missing step)".to_string(), "complete"),
            };
            let when = match d.days_overdue {
                0 => "today".to_string(),
                n => format!("{n}d late"),
            };
            vec![
                d.enrollment_id.to_string(),
                contact.map_or_else(|| format!("#{}", d.contact_id), |c| c.full_name()),
                d.sequence_name.clone().unwrap_or_else(|| "-".to_string()),
                d.step_number.to_string(),
                kind,
                what,
                when,
                action.to_string(),
            ]
        })
        .collect();
    print_table(
        &["ID", "CONTACT", "SEQUENCE", "STEP", "TYPE", "SUBJECT", "DUE", "ACTION"],
        rows,
    );
    Ok(())
}
