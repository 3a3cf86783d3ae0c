use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::io::{self, BufRead, IsTerminal, Write};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use heft_core::models::{KG_PER_LB, LBS_PER_KG, WeightEntry};

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(today()),
        Some(s) => match s.as_str() {
            "today" => Ok(today()),
            "yesterday" => Ok(today() - chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD, today or yesterday")
            }),
        },
    }
}

/// Convert a weight in `unit` to kilograms.
pub(crate) fn to_kg(value: f64, unit: &str) -> Result<f64> {
    if !value.is_finite() || value <= 0.0 {
        bail!("Weight must be greater than 0");
    }
    match unit.to_lowercase().as_str() {
        "kg" => Ok(value),
        "lbs" | "lb" => Ok(no_neg_zero(value * KG_PER_LB)),
        _ => bail!("Invalid unit '{unit}'. Use 'kg' or 'lbs'"),
    }
}

pub(crate) fn kg_and_lbs(kg: f64) -> String {
    format!("{kg:.1} kg ({:.1} lbs)", kg * LBS_PER_KG)
}

/// Read one line from stdin after printing `label` to stderr.
pub(crate) fn prompt_line(label: &str) -> Result<String> {
    eprint!("{label}: ");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().context("No input")??;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Like `prompt_line`, but the input is not echoed when stdin is a terminal.
pub(crate) fn prompt_secret(label: &str) -> Result<String> {
    if io::stdin().is_terminal() {
        rpassword::prompt_password(format!("{label}: ")).context("Failed to read input")
    } else {
        prompt_line(label)
    }
}

/// Use `given` if present, otherwise prompt for it.
pub(crate) fn value_or_prompt(given: Option<String>, label: &str) -> Result<String> {
    match given {
        Some(v) => Ok(v),
        None => prompt_line(label),
    }
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

pub(crate) fn print_weight_table(entries: &[WeightEntry]) {
    #[derive(Tabled)]
    struct WeightRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Weight (kg)")]
        kg: String,
        #[tabled(rename = "Weight (lbs)")]
        lbs: String,
        #[tabled(rename = "Goal")]
        goal: String,
        #[tabled(rename = "Notes")]
        notes: String,
    }

    let rows: Vec<WeightRow> = entries
        .iter()
        .map(|e| WeightRow {
            date: e.date.format("%Y-%m-%d").to_string(),
            kg: format!("{:.1}", e.weight_kg),
            lbs: format!("{:.1}", e.weight_kg * LBS_PER_KG),
            goal: e.goal.to_string(),
            notes: truncate(&e.notes, 40),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}
