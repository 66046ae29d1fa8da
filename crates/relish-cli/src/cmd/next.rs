use crate::output::print_json;
use anyhow::Context;
use relish_core::{journey::Journey, progress::NextStep};
use std::path::Path;

pub fn run(root: &Path, manual: &str, json: bool) -> anyhow::Result<()> {
    let (config, store) = super::open(root)?;
    let journey = Journey::from_config(&store, &config).context("invalid configuration")?;
    let progress = journey
        .progress(manual)
        .with_context(|| format!("no onboarding progress for '{manual}'. Run: relish progress start {manual}"))?;
    let step = journey.aggregator().next_step(&progress);
    let can_launch = journey.aggregator().can_launch(&progress);

    if json {
        return print_json(&serde_json::json!({
            "manual": manual,
            "next": step,
            "can_launch": can_launch,
            "current_layer": progress.current_layer,
            "can_graduate": journey.aggregator().can_graduate(&progress),
        }));
    }

    match step {
        NextStep::Phase(phase) => {
            println!("Phase:   {}", phase.display_name());
            println!("About:   {}", phase.description());
            let layers: Vec<String> = journey
                .aggregator()
                .plan()
                .layers_for(phase)
                .iter()
                .map(|l| {
                    let met = progress.layer_statuses.get(l).is_some_and(|s| s.met);
                    format!("L{} {}{}", l.number(), l, if met { " (met)" } else { "" })
                })
                .collect();
            println!("Layers:  {}", layers.join(", "));
            if can_launch && !progress.launch_completed {
                println!("Launch is available: relish progress launch {manual}");
            }
        }
        NextStep::Launch => println!("All phases complete. Run: relish progress launch {manual}"),
        NextStep::Done => println!("Onboarding complete. The manual is live."),
    }
    if let Some(layer) = progress.current_layer {
        println!("Next layer: L{} {}", layer.number(), layer.display_name());
    }
    if journey.aggregator().can_graduate(&progress) {
        println!("Graduation is available: relish progress graduate {manual}");
    }
    Ok(())
}
