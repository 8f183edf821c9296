//! `studiolaunch plan`: report configuration and setup state, change nothing.

use anyhow::Result;
use std::path::Path;
use studiolaunch_core::config::{EnvSnapshot, LaunchConfig};
use studiolaunch_runtime::{LaunchPlan, Launcher, SystemRunner};

pub fn cmd_plan(config: &LaunchConfig, env: &EnvSnapshot, json: bool) -> Result<()> {
    let plan = Launcher::new(config, env, SystemRunner).plan();
    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print!("{}", render(&plan));
    }
    Ok(())
}

fn presence(path: &Path, present: bool) -> String {
    format!("{} ({})", path.display(), if present { "present" } else { "missing" })
}

fn render(plan: &LaunchPlan) -> String {
    let rows = [
        ("Subdomain", plan.subdomain.clone()),
        ("Access URL", plan.app_url.clone()),
        ("Bind address", plan.bind_addr.clone()),
        ("CSRF origins", plan.csrf_trusted_origins.clone()),
        (
            "Secret key",
            if plan.secret_key_pinned {
                "pinned (SECRET_KEY)".to_string()
            } else {
                "generated per launch".to_string()
            },
        ),
        ("Virtual env", presence(&plan.venv_dir, plan.venv_present)),
        (
            "Application",
            if plan.app_installed { "installed" } else { "not installed" }.to_string(),
        ),
        ("Data dir", presence(&plan.data_dir, plan.data_dir_present)),
        (
            "Entry point",
            plan.entry_point
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "not found".to_string()),
        ),
        ("Migrate", plan.migrate_command.clone().unwrap_or_else(|| "-".into())),
        ("Serve", plan.serve_command.clone().unwrap_or_else(|| "-".into())),
    ];
    rows.iter()
        .map(|(label, value)| format!("{:<14}{}\n", format!("{}:", label), value))
        .collect()
}
