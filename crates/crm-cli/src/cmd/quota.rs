use super::Globals;
use crate::output::{money, print_json, print_table};
use crm_core::actions;
use crm_core::quota::ForecastScope;

/// Print commit, best case and funnel against quota for this month.
pub fn run(g: &Globals, team: bool) -> anyhow::Result<()> {
    let s = g.session()?;
    let requested = if team {
        ForecastScope::Team
    } else {
        ForecastScope::Mine
    };
    if requested.effective(&s.config.session) != requested {
        eprintln!("note: the team view needs a manager session; showing your own numbers");
    }
    let report = actions::quota_report(&s.store, &s.config, requested, &s.now)?;

    if g.json {
        return print_json(&report);
    }
    let sum = &report.summary;
    println!(
        "{} quota for {}: {}",
        match report.scope {
            ForecastScope::Team => "Team",
            ForecastScope::Mine => "Your",
        },
        s.now.format("%B %Y"),
        money(report.quota)
    );
    print_table(
        &["MEASURE", "AMOUNT", "OF QUOTA"],
        vec![
            vec![
                "Commit".to_string(),
                money(sum.current_commit),
                format!("{:.0}%", sum.commit_pct),
            ],
            vec![
                "Best case".to_string(),
                money(sum.best_case),
                format!("{:.0}%", sum.best_case_pct),
            ],
            vec!["Funnel".to_string(), money(sum.total_funnel), String::new()],
        ],
    );
    Ok(())
}
