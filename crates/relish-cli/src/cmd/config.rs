use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use relish_core::config::{Config, WarnLevel};
use relish_core::types::Phase;
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the family configuration and phase layout
    Show,

    /// Validate the config for common mistakes
    Validate,
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;

    if json {
        return print_json(&config);
    }

    println!("Family:  {} ({})", config.family.name, config.family.id);
    println!(
        "Launch:  after {} completed phase(s)\n",
        config.onboarding.min_phases_for_launch
    );
    let rows = Phase::all()
        .iter()
        .map(|p| {
            let layers: Vec<String> = config
                .phases
                .get(p)
                .map(|ls| ls.iter().map(|l| format!("L{} {}", l.number(), l)).collect())
                .unwrap_or_default();
            vec![p.to_string(), layers.join(", ")]
        })
        .collect();
    print_table(&["PHASE", "REQUIRED LAYERS"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        print_json(&serde_json::json!({
            "warnings": warnings,
        }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
