use crate::output::{bar, print_json, print_table, yes_no};
use anyhow::Context;
use relish_core::{
    baseline::LayerBaselineStatus, journey::Journey, manual::Manual, types::LayerId,
};
use std::path::Path;

pub fn run(root: &Path, manual_id: &str, layer: Option<&str>, json: bool) -> anyhow::Result<()> {
    let (config, store) = super::open(root)?;
    let journey = Journey::from_config(&store, &config).context("invalid configuration")?;
    let manual = Manual::load(&store, manual_id)
        .with_context(|| format!("cannot evaluate manual '{manual_id}'"))?;
    let evaluator = journey.evaluator();

    if let Some(layer) = layer {
        let layer: LayerId = layer.parse()?;
        let status = evaluator.evaluate(&manual, layer);
        if json {
            return print_json(&status);
        }
        print_layer(&status);
        return Ok(());
    }

    let baselines = evaluator.evaluate_all(&manual);
    if json {
        let statuses: Vec<&LayerBaselineStatus> = baselines.values().collect();
        return print_json(&serde_json::json!({
            "manual": manual_id,
            "manual_type": manual.manual_type(),
            "layers": statuses,
        }));
    }

    println!("Manual: {} ({})\n", manual.manual_id, manual.manual_type());
    let rows = LayerId::onboarding_order()
        .iter()
        .filter_map(|l| baselines.get(l))
        .map(|s| {
            vec![
                format!("L{}", s.layer.number()),
                s.name.clone(),
                format!("{} {:>3}%", bar(s.percent_complete), s.percent_complete),
                yes_no(s.met).to_string(),
                s.missing.join("; "),
            ]
        })
        .collect();
    print_table(&["LAYER", "NAME", "BASELINE", "MET", "MISSING"], rows);
    Ok(())
}

fn print_layer(status: &LayerBaselineStatus) {
    println!("Layer:    L{} {} ({})", status.layer.number(), status.name, status.layer);
    println!("Baseline: {} {}%", bar(status.percent_complete), status.percent_complete);
    println!("Met:      {}", yes_no(status.met));
    for check in &status.checks {
        let mark = if check.satisfied { "x" } else { " " };
        println!(
            "  [{mark}] {} ({}/{})",
            check.description, check.count, check.minimum
        );
    }
    if !status.missing.is_empty() {
        println!("Missing:");
        for m in &status.missing {
            println!("  - {m}");
        }
    }
}
