use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use heft_core::analytics::{HistogramBin, TimeRange};
use heft_core::service::HeftService;

use super::helpers::today;

const BAR_WIDTH: usize = 30;

#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
fn bar(count: usize, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let len = ((count as f64 / max as f64) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(len.max(usize::from(count > 0)))
}

fn print_histogram(bins: &[HistogramBin]) {
    let max = bins.iter().map(|b| b.count).max().unwrap_or(0);
    for b in bins {
        println!(
            "  {:>6.1}–{:<6.1} {:>4} {}",
            b.lower,
            b.upper,
            b.count,
            bar(b.count, max)
        );
    }
}

pub(crate) fn cmd_analytics(
    svc: &HeftService,
    user: &str,
    range: &str,
    window: usize,
    bins: usize,
    json: bool,
) -> Result<()> {
    let range: TimeRange = range.parse()?;
    let report = svc.analytics(user, range, today(), window, bins)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let Some(ref stats) = report.stats else {
        eprintln!("No weight entries in range {range}.");
        return Ok(());
    };

    println!(
        "Range {range}: {} to {} ({} entries)",
        stats.first_date.format("%Y-%m-%d"),
        stats.last_date.format("%Y-%m-%d"),
        stats.count
    );
    println!(
        "  Mean {:.1} kg  Min {:.1} kg  Max {:.1} kg  Spread {:.1} kg\n",
        stats.mean, stats.min, stats.max, stats.range
    );

    #[derive(Tabled)]
    struct TrendRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Weight (kg)")]
        weight: String,
        #[tabled(rename = "Avg (kg)")]
        average: String,
    }

    let rows: Vec<TrendRow> = report
        .trend
        .iter()
        .map(|t| TrendRow {
            date: t.date.format("%Y-%m-%d").to_string(),
            weight: format!("{:.1}", t.weight),
            average: format!("{:.1}", t.average),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..3)).with(Alignment::right()))
        .to_string();
    println!("{window}-entry moving average:");
    println!("{table}");

    println!("\nDistribution:");
    print_histogram(&report.histogram);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_scales_to_max() {
        assert_eq!(bar(10, 10).chars().count(), BAR_WIDTH);
        assert_eq!(bar(5, 10).chars().count(), BAR_WIDTH / 2);
        assert_eq!(bar(0, 10), "");
        assert_eq!(bar(0, 0), "");
    }

    #[test]
    fn test_bar_nonzero_count_is_visible() {
        assert_eq!(bar(1, 1000).chars().count(), 1);
    }
}
