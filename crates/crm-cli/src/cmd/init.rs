use super::Globals;
use crate::output::print_json;
use anyhow::Context;
use crm_core::actions;

pub fn run(g: &Globals, manager: bool) -> anyhow::Result<()> {
    let user = g
        .user
        .clone()
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "me".to_string());
    let mut config = actions::init(&g.root, &user)
        .with_context(|| format!("failed to initialize {}", g.root.display()))?;
    if manager && !config.session.is_manager {
        config.session.is_manager = true;
        config.save(&g.root).context("failed to save config")?;
    }

    if g.json {
        print_json(&config)?;
    } else {
        println!(
            "Initialized CRM at {} for user '{}'",
            g.root.display(),
            config.session.user_id
        );
    }
    Ok(())
}
