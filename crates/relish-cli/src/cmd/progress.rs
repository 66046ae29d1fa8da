use crate::output::{bar, print_json, print_table, yes_no};
use anyhow::Context;
use clap::Subcommand;
use relish_core::{
    journey::{Journey, RefreshOutcome},
    milestone,
    progress::OnboardingProgress,
    types::{LayerId, Phase},
};
use std::path::Path;

#[derive(Subcommand)]
pub enum ProgressSubcommand {
    /// Begin onboarding for a manual
    Start { manual: String },
    /// Re-evaluate a manual and advance its onboarding
    Refresh { manual: String },
    /// Show onboarding progress
    Show { manual: String },
    /// Mark a milestone celebration as shown
    Ack { manual: String, milestone: String },
    /// Complete the launch step
    Launch { manual: String },
    /// Graduate a manual once every layer is complete
    Graduate { manual: String },
}

pub fn run(root: &Path, subcmd: ProgressSubcommand, json: bool) -> anyhow::Result<()> {
    let (config, store) = super::open(root)?;
    let journey = Journey::from_config(&store, &config).context("invalid configuration")?;

    match subcmd {
        ProgressSubcommand::Start { manual } => start(&journey, &manual, json),
        ProgressSubcommand::Refresh { manual } => refresh(&journey, &manual, json),
        ProgressSubcommand::Show { manual } => show(&journey, &manual, json),
        ProgressSubcommand::Ack { manual, milestone } => ack(&journey, &manual, &milestone, json),
        ProgressSubcommand::Launch { manual } => launch(&journey, &manual, json),
        ProgressSubcommand::Graduate { manual } => graduate(&journey, &manual, json),
    }
}

fn phase_label(phase: Option<Phase>) -> String {
    phase
        .map(|p| p.display_name().to_string())
        .unwrap_or_else(|| "-".to_string())
}

// ---------------------------------------------------------------------------
// start / refresh
// ---------------------------------------------------------------------------

fn start(journey: &Journey, manual: &str, json: bool) -> anyhow::Result<()> {
    let progress = journey
        .start(manual)
        .with_context(|| format!("failed to start onboarding for '{manual}'"))?;

    if json {
        print_json(&progress)?;
    } else {
        println!("Started onboarding for '{manual}'");
        println!("Phase: {}", phase_label(progress.current_phase));
    }
    Ok(())
}

fn refresh(journey: &Journey, manual: &str, json: bool) -> anyhow::Result<()> {
    let outcome = journey
        .refresh(manual)
        .with_context(|| format!("failed to refresh onboarding for '{manual}'"))?;

    if json {
        return print_json(&outcome);
    }

    let RefreshOutcome {
        progress,
        milestones,
        phase_completed,
        ..
    } = outcome;

    println!("Overall: {} {}%", bar(progress.overall_percent), progress.overall_percent);
    if let Some(phase) = phase_completed {
        println!("Phase complete: {}", phase.display_name());
    }
    println!("Phase:   {}", phase_label(progress.current_phase));
    for m in &milestones {
        println!("\n{} {}", m.icon, m.celebration.title);
        println!("  {}", m.celebration.message);
        println!("  {}", m.celebration.encouragement);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(journey: &Journey, manual: &str, json: bool) -> anyhow::Result<()> {
    let progress = journey
        .progress(manual)
        .with_context(|| format!("no onboarding progress for '{manual}'"))?;
    let summary = milestone::summary(&progress);
    let next = journey.aggregator().next_step(&progress);

    if json {
        return print_json(&serde_json::json!({
            "progress": progress,
            "milestones": summary,
            "next": next,
            "can_launch": journey.aggregator().can_launch(&progress),
            "can_graduate": journey.aggregator().can_graduate(&progress),
        }));
    }

    print_progress(journey, &progress);
    println!(
        "\nMilestones: {}/{} ({}%)",
        summary.achieved, summary.total, summary.percent
    );
    for record in &progress.milestones_achieved {
        let name = milestone::find(progress.manual_type, &record.id)
            .map(|m| m.name)
            .unwrap_or(record.id.as_str());
        let seen = if record.celebration_shown { "" } else { " (new)" };
        println!("  - {name}{seen}");
    }
    if let Some(next_id) = summary.next {
        println!("Next milestone: {next_id}");
    }
    println!("Next step: {next}");
    Ok(())
}

fn print_progress(journey: &Journey, progress: &OnboardingProgress) {
    println!("Manual:   {} ({})", progress.manual_id, progress.manual_type);
    println!("Phase:    {}", phase_label(progress.current_phase));
    println!(
        "Layer:    {}",
        progress
            .current_layer
            .map(|l| format!("L{} {}", l.number(), l))
            .unwrap_or_else(|| "-".to_string())
    );
    let done: Vec<&str> = progress.phases_completed.iter().map(|p| p.as_str()).collect();
    println!("Complete: {}", if done.is_empty() { "-".to_string() } else { done.join(", ") });
    println!("Overall:  {} {}%", bar(progress.overall_percent), progress.overall_percent);
    println!("Launched: {}", yes_no(progress.launch_completed));
    println!("Graduated: {}\n", yes_no(progress.is_graduated()));

    let plan = journey.aggregator().plan();
    let rows = LayerId::onboarding_order()
        .iter()
        .filter_map(|l| progress.layer_statuses.get(l))
        .map(|s| {
            let who: Vec<&str> = s.completed_respondents.iter().map(|r| r.as_str()).collect();
            vec![
                format!("L{}", s.layer.number()),
                s.name.clone(),
                plan.phase_for(s.layer).map(|p| p.as_str()).unwrap_or("-").to_string(),
                s.state.to_string(),
                format!("{}%", s.content_percent),
                format!("{}%", s.perspective_percent),
                who.join(", "),
            ]
        })
        .collect();
    print_table(
        &["LAYER", "NAME", "PHASE", "STATE", "CONTENT", "PERSPECTIVE", "HEARD FROM"],
        rows,
    );
}

// ---------------------------------------------------------------------------
// ack / launch / graduate
// ---------------------------------------------------------------------------

fn ack(journey: &Journey, manual: &str, milestone_id: &str, json: bool) -> anyhow::Result<()> {
    let progress = journey
        .acknowledge(manual, milestone_id)
        .with_context(|| format!("failed to acknowledge '{milestone_id}'"))?;

    if json {
        print_json(&serde_json::json!({
            "manual": manual,
            "milestone": milestone_id,
            "celebration_shown": true,
            "version": progress.version,
        }))?;
    } else {
        println!("Acknowledged '{milestone_id}' for '{manual}'");
    }
    Ok(())
}

fn launch(journey: &Journey, manual: &str, json: bool) -> anyhow::Result<()> {
    let progress = journey
        .launch(manual)
        .with_context(|| format!("cannot launch '{manual}'"))?;

    if json {
        print_json(&serde_json::json!({
            "manual": manual,
            "launch_completed": progress.launch_completed,
        }))?;
    } else {
        println!("Launched '{manual}'. Next step: {}", journey.aggregator().next_step(&progress));
    }
    Ok(())
}

fn graduate(journey: &Journey, manual: &str, json: bool) -> anyhow::Result<()> {
    let progress = journey
        .graduate(manual)
        .with_context(|| format!("cannot graduate '{manual}'"))?;

    if json {
        print_json(&serde_json::json!({
            "manual": manual,
            "graduated_at": progress.graduated_at,
        }))?;
    } else if let Some(at) = progress.graduated_at {
        println!("Graduated '{manual}' at {}", at.format("%Y-%m-%d %H:%M UTC"));
    }
    Ok(())
}
