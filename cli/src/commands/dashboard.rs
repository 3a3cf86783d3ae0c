use anyhow::Result;

use heft_core::metrics::{PerformanceLevel, RandomPicker};
use heft_core::service::HeftService;

use super::helpers::{kg_and_lbs, no_neg_zero, print_weight_table, today};

fn level_marker(level: PerformanceLevel) -> &'static str {
    match level {
        PerformanceLevel::Good => "▲",
        PerformanceLevel::Ok => "●",
        PerformanceLevel::Bad => "▼",
    }
}

pub(crate) fn cmd_dashboard(svc: &HeftService, user: &str, json: bool) -> Result<()> {
    let mut picker = RandomPicker::new();
    let dash = svc.dashboard(user, today(), &mut picker)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&dash)?);
        return Ok(());
    }

    let p = &dash.profile;
    println!("{} ({})", p.name, p.goal.description());
    match dash.latest {
        Some(ref e) => println!(
            "  Current:   {} on {}",
            kg_and_lbs(e.weight_kg),
            e.date.format("%Y-%m-%d")
        ),
        None => println!("  Current:   {} (from profile)", kg_and_lbs(p.current_weight)),
    }
    println!("  Target:    {}", kg_and_lbs(p.target_weight));
    println!("  Progress:  {:.0}%", dash.goal_progress);
    if let Some(ref bmi) = dash.bmi {
        println!("  BMI:       {:.1} ({})", bmi.value, bmi.label);
    }
    println!(
        "  Trend:     {:+.2} kg/week",
        no_neg_zero((dash.weekly_change * 100.0).round() / 100.0)
    );
    match dash.days_since_last_entry {
        0 if dash.latest.is_some() => println!("  Last entry: today"),
        0 => {}
        1 => println!("  Last entry: 1 day ago"),
        n => println!("  Last entry: {n} days ago"),
    }
    if let Some(ref stats) = dash.stats {
        println!(
            "  Range:     {:.1}–{:.1} kg over {} entries",
            stats.min, stats.max, stats.count
        );
    }

    println!(
        "\n{} {}",
        level_marker(dash.motivation.level),
        dash.motivation.message
    );

    if dash.recent.is_empty() {
        eprintln!("\nNo weight entries yet. Use `heft weight log` to record your weight.");
    } else {
        println!("\nRecent entries:");
        print_weight_table(&dash.recent);
    }

    Ok(())
}
