use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::Serialize;

use crate::models::WeightEntry;

/// Default number of histogram bins on the analytics view.
pub const DEFAULT_BINS: usize = 20;

/// Upper bound on histogram bins; larger requests are clamped to it.
pub const MAX_BINS: usize = 1000;

/// Summary numbers over a slice of entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightStats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

impl WeightStats {
    /// `None` for an empty slice. `entries` must be sorted by date.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_entries(entries: &[WeightEntry]) -> Option<Self> {
        let first = entries.first()?;
        let last = entries.last()?;
        let (min, max, sum) = entries.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), e| (min.min(e.weight_kg), max.max(e.weight_kg), sum + e.weight_kg),
        );
        Some(Self {
            count: entries.len(),
            mean: sum / entries.len() as f64,
            min,
            max,
            range: max - min,
            first_date: first.date,
            last_date: last.date,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub weight: f64,
    pub average: f64,
}

/// Trailing simple moving average over `window` entries. The first points
/// average over however many entries precede them.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn moving_average(entries: &[WeightEntry], window: usize) -> Vec<TrendPoint> {
    let window = window.max(1);
    let mut sum = 0.0;
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| {
            sum += e.weight_kg;
            if i >= window {
                sum -= entries[i - window].weight_kg;
            }
            let n = (i + 1).min(window);
            TrendPoint {
                date: e.date,
                weight: e.weight_kg,
                average: sum / n as f64,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width weight distribution over `[min, max]`. The maximum value is
/// counted in the last bin. `bins` is clamped to `1..=MAX_BINS`.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
pub fn histogram(entries: &[WeightEntry], bins: usize) -> Vec<HistogramBin> {
    let Some(stats) = WeightStats::from_entries(entries) else {
        return Vec::new();
    };
    if stats.range <= 0.0 {
        return vec![HistogramBin {
            lower: stats.min,
            upper: stats.max,
            count: entries.len(),
        }];
    }

    let bins = bins.clamp(1, MAX_BINS);
    let width = stats.range / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: stats.min + width * i as f64,
            upper: stats.min + width * (i + 1) as f64,
            count: 0,
        })
        .collect();

    for e in entries {
        let idx = (((e.weight_kg - stats.min) / width).floor() as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

/// Look-back windows offered on the analytics view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TimeRange {
    #[serde(rename = "1M")]
    Month,
    #[serde(rename = "3M")]
    Quarter,
    #[serde(rename = "6M")]
    HalfYear,
    #[serde(rename = "1Y")]
    Year,
    #[default]
    All,
}

impl TimeRange {
    #[must_use]
    pub fn days(self) -> Option<i64> {
        match self {
            Self::Month => Some(30),
            Self::Quarter => Some(90),
            Self::HalfYear => Some(180),
            Self::Year => Some(365),
            Self::All => None,
        }
    }

    /// First date included in the range, or `None` for everything. The day
    /// exactly `days()` ago is outside the range, so `Month` on March 31
    /// starts on March 2.
    #[must_use]
    pub fn cutoff(self, today: NaiveDate) -> Option<NaiveDate> {
        self.days().map(|d| today - chrono::Duration::days(d - 1))
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Month => "1M",
            Self::Quarter => "3M",
            Self::HalfYear => "6M",
            Self::Year => "1Y",
            Self::All => "All",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimeRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "1m" => Ok(Self::Month),
            "3m" => Ok(Self::Quarter),
            "6m" => Ok(Self::HalfYear),
            "1y" => Ok(Self::Year),
            "all" => Ok(Self::All),
            _ => bail!("Invalid range '{s}'. Use 1M, 3M, 6M, 1Y or All"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GoalKind;

    fn entries(weights: &[f64]) -> Vec<WeightEntry> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        weights
            .iter()
            .enumerate()
            .map(|(i, &kg)| WeightEntry {
                date: base + chrono::Duration::days(i as i64),
                weight_kg: kg,
                notes: String::new(),
                goal: GoalKind::Maintenance,
            })
            .collect()
    }

    #[test]
    fn test_stats_empty() {
        assert!(WeightStats::from_entries(&[]).is_none());
    }

    #[test]
    fn test_stats_values() {
        let stats = WeightStats::from_entries(&entries(&[80.0, 82.0, 81.0])).unwrap();
        assert_eq!(stats.count, 3);
        assert!((stats.mean - 81.0).abs() < 1e-9);
        assert!((stats.min - 80.0).abs() < f64::EPSILON);
        assert!((stats.max - 82.0).abs() < f64::EPSILON);
        assert!((stats.range - 2.0).abs() < f64::EPSILON);
        assert_eq!(stats.first_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(stats.last_date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    }

    #[test]
    fn test_moving_average_warmup_and_window() {
        let points = moving_average(&entries(&[80.0, 82.0, 84.0, 86.0]), 2);
        assert_eq!(points.len(), 4);
        assert!((points[0].average - 80.0).abs() < 1e-9);
        assert!((points[1].average - 81.0).abs() < 1e-9);
        assert!((points[2].average - 83.0).abs() < 1e-9);
        assert!((points[3].average - 85.0).abs() < 1e-9);
    }

    #[test]
    fn test_moving_average_zero_window_is_identity() {
        let points = moving_average(&entries(&[80.0, 90.0]), 0);
        assert!((points[1].average - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_counts_everything() {
        let data = entries(&[80.0, 80.5, 81.0, 82.0, 84.0]);
        let bins = histogram(&data, 4);
        assert_eq!(bins.len(), 4);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 5);
        // Max lands in the last bin
        assert_eq!(bins[3].count, 1);
        assert!((bins[0].lower - 80.0).abs() < f64::EPSILON);
        assert!((bins[3].upper - 84.0).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_flat_series() {
        let bins = histogram(&entries(&[80.0, 80.0, 80.0]), DEFAULT_BINS);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].count, 3);
        assert!(histogram(&[], DEFAULT_BINS).is_empty());
    }

    #[test]
    fn test_histogram_clamps_bin_count() {
        let data = entries(&[80.0, 82.0]);
        let bins = histogram(&data, usize::MAX / 2);
        assert_eq!(bins.len(), MAX_BINS);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
        assert_eq!(histogram(&data, 0).len(), 1);
    }

    #[test]
    fn test_time_range_parse() {
        assert_eq!("1m".parse::<TimeRange>().unwrap(), TimeRange::Month);
        assert_eq!("3M".parse::<TimeRange>().unwrap(), TimeRange::Quarter);
        assert_eq!("6M".parse::<TimeRange>().unwrap(), TimeRange::HalfYear);
        assert_eq!("1Y".parse::<TimeRange>().unwrap(), TimeRange::Year);
        assert_eq!("ALL".parse::<TimeRange>().unwrap(), TimeRange::All);
        assert!("2W".parse::<TimeRange>().is_err());
    }

    #[test]
    fn test_time_range_cutoff() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        assert_eq!(
            TimeRange::Month.cutoff(today),
            Some(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap())
        );
        assert_eq!(
            TimeRange::Year.cutoff(today),
            Some(NaiveDate::from_ymd_opt(2023, 4, 2).unwrap())
        );
        assert_eq!(TimeRange::All.cutoff(today), None);
    }
}
