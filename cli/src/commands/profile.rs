use anyhow::{Result, bail};

use heft_core::models::{GoalKind, ProfileUpdate, UserProfile};
use heft_core::service::HeftService;

use super::helpers::{kg_and_lbs, to_kg};

fn print_profile(p: &UserProfile) {
    println!("Name:           {}", p.name);
    println!("Goal:           {} ({})", p.goal, p.goal.description());
    println!("Target weight:  {}", kg_and_lbs(p.target_weight));
    println!("Current weight: {}", kg_and_lbs(p.current_weight));
    match p.height_cm {
        Some(h) => println!("Height:         {h:.0} cm"),
        None => println!("Height:         not set"),
    }
}

pub(crate) fn cmd_profile_show(svc: &HeftService, user: &str, json: bool) -> Result<()> {
    let profile = svc.profile(user)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        print_profile(&profile);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_profile_set(
    svc: &HeftService,
    user: &str,
    name: Option<String>,
    goal: Option<String>,
    target: Option<f64>,
    current: Option<f64>,
    height: Option<f64>,
    unit: &str,
    json: bool,
) -> Result<()> {
    let update = ProfileUpdate {
        name,
        goal: goal.map(|g| g.parse::<GoalKind>()).transpose()?,
        target_weight: target.map(|v| to_kg(v, unit)).transpose()?,
        current_weight: current.map(|v| to_kg(v, unit)).transpose()?,
        height_cm: height,
    };
    if update.name.is_none()
        && update.goal.is_none()
        && update.target_weight.is_none()
        && update.current_weight.is_none()
        && update.height_cm.is_none()
    {
        bail!("Nothing to update. Pass at least one of --name, --goal, --target, --current, --height");
    }

    let profile = svc.update_profile(user, &update)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        println!("Profile updated.\n");
        print_profile(&profile);
    }
    Ok(())
}

pub(crate) fn cmd_profile_goals(json: bool) -> Result<()> {
    if json {
        let goals: Vec<_> = GoalKind::ALL
            .iter()
            .map(|g| serde_json::json!({ "goal": g, "description": g.description() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&goals)?);
    } else {
        for g in GoalKind::ALL {
            println!("{:<12} {}", g.as_str(), g.description());
        }
    }
    Ok(())
}
