use crate::output::{bar, print_json, print_table};
use anyhow::Context;
use relish_core::{domain, journey::Journey};
use std::path::Path;

pub fn run(root: &Path, manual: &str, json: bool) -> anyhow::Result<()> {
    let (config, store) = super::open(root)?;
    let journey = Journey::from_config(&store, &config).context("invalid configuration")?;
    let (_, baselines) = journey
        .evaluate(manual)
        .with_context(|| format!("cannot evaluate manual '{manual}'"))?;

    let statuses = domain::all_statuses(&baselines);
    let health = domain::baseline_health(&baselines);

    if json {
        return print_json(&serde_json::json!({
            "manual": manual,
            "baseline_health": health,
            "available": domain::available_domains(&baselines),
            "blocked": domain::blocked_domains(&baselines),
            "domains": statuses,
        }));
    }

    println!("Baseline health: {} {health}%\n", bar(health));
    let rows = statuses
        .iter()
        .map(|s| {
            let layers: Vec<String> = s.required_layers.iter().map(|l| format!("L{}", l.number())).collect();
            vec![
                s.domain.to_string(),
                layers.join(","),
                format!("{}%", s.completion_percent),
                if s.complete {
                    "open".to_string()
                } else {
                    format!("blocked ({} missing)", s.missing.len())
                },
            ]
        })
        .collect();
    print_table(&["DOMAIN", "NEEDS", "BASELINE", "STATUS"], rows);
    Ok(())
}
