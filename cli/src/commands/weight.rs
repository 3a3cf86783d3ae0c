use anyhow::Result;

use heft_core::models::{GoalKind, NewWeightEntry};
use heft_core::service::HeftService;

use super::helpers::{json_error, kg_and_lbs, parse_date, print_weight_table, to_kg, today};

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_weight_log(
    svc: &HeftService,
    user: &str,
    value: f64,
    unit: &str,
    date: Option<String>,
    notes: Option<String>,
    goal: Option<String>,
    replace: bool,
    json: bool,
) -> Result<()> {
    let weight_kg = to_kg(value, unit)?;
    if !unit.eq_ignore_ascii_case("kg") && !json {
        eprintln!("Converting {value:.1} lbs → {weight_kg:.2} kg");
    }

    let goal = match goal {
        Some(g) => g.parse::<GoalKind>()?,
        None => svc.profile(user)?.goal,
    };
    let entry = NewWeightEntry {
        date: parse_date(date)?,
        weight_kg,
        notes: notes.unwrap_or_default(),
        goal,
    };

    let outcome = svc.add_weight(user, entry, today(), replace)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        let e = &outcome.entry;
        let verb = if outcome.replaced.is_some() {
            "Replaced"
        } else {
            "Logged"
        };
        println!("{verb} {} for {}", kg_and_lbs(e.weight_kg), e.date.format("%Y-%m-%d"));
        if !e.notes.is_empty() {
            println!("  Notes: {}", e.notes);
        }
    }

    Ok(())
}

pub(crate) fn cmd_weight_show(
    svc: &HeftService,
    user: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;

    if let Some(e) = svc.get_weight(user, date)? {
        if json {
            println!("{}", serde_json::to_string_pretty(&e)?);
        } else {
            println!("{}: {}", e.date.format("%Y-%m-%d"), kg_and_lbs(e.weight_kg));
            println!("  Goal: {}", e.goal);
            if !e.notes.is_empty() {
                println!("  Notes: {}", e.notes);
            }
        }
    } else {
        let msg = format!("No weight entry for {}", date.format("%Y-%m-%d"));
        if json {
            println!("{}", json_error(&msg));
        } else {
            eprintln!("{msg}");
        }
    }

    Ok(())
}

pub(crate) fn cmd_weight_history(
    svc: &HeftService,
    user: &str,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let entries = svc.history(user, limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        eprintln!("No weight entries found. Use `heft weight log` to record your weight.");
    } else {
        print_weight_table(&entries);
    }

    Ok(())
}

pub(crate) fn cmd_weight_delete(svc: &HeftService, user: &str, date: &str, json: bool) -> Result<()> {
    let date = parse_date(Some(date.to_string()))?;
    let date_str = date.format("%Y-%m-%d").to_string();

    match svc.delete_weight(user, date)? {
        Some(removed) => {
            if json {
                println!("{}", serde_json::json!({ "deleted": removed }));
            } else {
                println!("Deleted weight entry for {date_str} ({:.1} kg)", removed.weight_kg);
            }
        }
        None => {
            let msg = format!("No weight entry for {date_str}");
            if json {
                println!("{}", json_error(&msg));
            } else {
                eprintln!("{msg}");
            }
        }
    }

    Ok(())
}
