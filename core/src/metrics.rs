//! Derived indicators over a weight log and a profile.
//!
//! Everything here is a pure function: no storage access, no clock reads,
//! and no errors. Inputs outside the useful domain (empty logs, missing
//! height) produce documented sentinel values, usually `0`.

use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use serde::Serialize;

use crate::log::WeightLog;
use crate::models::{GoalDirection, GoalKind};

/// Number of trailing entries the weekly change rate looks at.
pub const TREND_WINDOW: usize = 28;

/// Body mass index. Returns `0.0` when the height is not positive.
#[must_use]
pub fn bmi(weight_kg: f64, height_cm: f64) -> f64 {
    if height_cm <= 0.0 {
        return 0.0;
    }
    let height_m = height_cm / 100.0;
    weight_kg / (height_m * height_m)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Underweight => "Underweight",
            Self::Normal => "Normal",
            Self::Overweight => "Overweight",
            Self::Obese => "Obese",
        }
    }

    /// Display color as a hex RGB string.
    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            Self::Underweight => "#3498db",
            Self::Normal => "#2ecc71",
            Self::Overweight => "#f39c12",
            Self::Obese => "#e74c3c",
        }
    }
}

/// Tier a BMI value. Each tier includes its lower bound.
#[must_use]
pub fn bmi_category(bmi: f64) -> BmiCategory {
    if bmi < 18.5 {
        BmiCategory::Underweight
    } else if bmi < 25.0 {
        BmiCategory::Normal
    } else if bmi < 30.0 {
        BmiCategory::Overweight
    } else {
        BmiCategory::Obese
    }
}

/// Percentage of the distance from `start` to `target` covered so far,
/// clamped to `[0, 100]`.
///
/// Movement away from the start counts the same in either direction: a user
/// on a cut who gains 2 kg of a 4 kg target distance reads as 50%. This is
/// intentional and pinned by
/// `test_goal_progress_counts_movement_in_either_direction`.
///
/// Returns `0.0` when there is no start weight or the start already equals
/// the target.
#[must_use]
pub fn goal_progress(current: f64, target: f64, start: Option<f64>) -> f64 {
    let Some(start) = start else {
        return 0.0;
    };
    let distance = (target - start).abs();
    if distance < f64::EPSILON {
        return 0.0;
    }
    ((current - start).abs() / distance * 100.0).clamp(0.0, 100.0)
}

/// Whole days between the latest logged date and `today`; `0` for an empty
/// log or when the latest entry is dated after `today`.
#[must_use]
pub fn days_since_last_entry(log: &WeightLog, today: NaiveDate) -> i64 {
    log.last()
        .map_or(0, |last| (today - last.date).num_days().max(0))
}

/// Average change in kg per week across the last [`TREND_WINDOW`] entries,
/// measured from the first to the last of them.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn weekly_change_rate(log: &WeightLog) -> f64 {
    let window = log.tail(TREND_WINDOW);
    let (Some(first), Some(last)) = (window.first(), window.last()) else {
        return 0.0;
    };
    if window.len() < 2 {
        return 0.0;
    }
    let span_days = (last.date - first.date).num_days();
    if span_days == 0 {
        return 0.0;
    }
    (last.weight_kg - first.weight_kg) / span_days as f64 * 7.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceLevel {
    Good,
    Ok,
    Bad,
}

/// Grade a weekly change against what the goal asks for.
#[must_use]
pub fn classify_performance(goal: GoalKind, weekly_change: f64) -> PerformanceLevel {
    match goal.direction() {
        GoalDirection::Loss => {
            if weekly_change < -0.3 {
                PerformanceLevel::Good
            } else if weekly_change < 0.0 {
                PerformanceLevel::Ok
            } else {
                PerformanceLevel::Bad
            }
        }
        GoalDirection::Gain => {
            if weekly_change > 0.3 {
                PerformanceLevel::Good
            } else if weekly_change > 0.0 {
                PerformanceLevel::Ok
            } else {
                PerformanceLevel::Bad
            }
        }
        GoalDirection::Maintain => {
            let drift = weekly_change.abs();
            if drift < 0.2 {
                PerformanceLevel::Good
            } else if drift < 0.5 {
                PerformanceLevel::Ok
            } else {
                PerformanceLevel::Bad
            }
        }
    }
}

const CUT_GOOD: &[&str] = &[
    "Great pace! The scale is moving exactly where you want it.",
    "Steady loss week after week. Keep doing what you're doing.",
    "Your cut is on track. Consistency is paying off.",
];
const CUT_OK: &[&str] = &[
    "Trending down, slowly. Small wins still count.",
    "You're heading the right way. Tighten things up a little for faster results.",
    "Progress is progress. Stay patient and stay consistent.",
];
const CUT_BAD: &[&str] = &[
    "The trend is flat or rising. Time to review your intake.",
    "Tough stretch. Reset this week and focus on the basics.",
    "Don't give up. One week doesn't define your cut.",
];
const BULK_GOOD: &[&str] = &[
    "Solid gains! Your surplus is doing its job.",
    "Weight is climbing nicely. Keep feeding those lifts.",
    "Right on pace for your bulk. Keep it up.",
];
const BULK_OK: &[&str] = &[
    "Gaining, but slowly. A little more food might help.",
    "Moving up. Consider a slightly bigger surplus.",
    "You're on your way. Stay consistent with meals.",
];
const BULK_BAD: &[&str] = &[
    "The scale isn't moving up. Time to eat more.",
    "No gains this stretch. Check your daily calories.",
    "Bulking takes food. Add a meal or a snack.",
];
const REVERSE_GOOD: &[&str] = &[
    "Smooth reverse! Your metabolism is adapting well.",
    "Controlled gain, just as planned.",
    "Textbook reverse diet. Keep the increases gradual.",
];
const REVERSE_OK: &[&str] = &[
    "Slow and steady. That's the point of a reverse.",
    "Small upward drift. Right where a reverse should be.",
    "You're easing back up. Keep nudging calories.",
];
const REVERSE_BAD: &[&str] = &[
    "Weight isn't rising yet. You can add calories a bit faster.",
    "Flat or dropping. Check that your increases are sticking.",
    "Reverse stalled. Give the next step a little more food.",
];
const MAINTENANCE_GOOD: &[&str] = &[
    "Rock steady! Maintenance mastered.",
    "Your weight is stable. Great balance.",
    "Holding the line perfectly. Keep it up.",
];
const MAINTENANCE_OK: &[&str] = &[
    "A little drift, nothing to worry about.",
    "Mostly stable. Keep an eye on the trend.",
    "Close to maintenance. Small adjustments will do.",
];
const MAINTENANCE_BAD: &[&str] = &[
    "Your weight is drifting. Time to rebalance.",
    "Noticeable change this stretch. Revisit your routine.",
    "Maintenance slipped. Check in with your habits.",
];

/// The fixed message pool for a goal and level.
#[must_use]
pub fn message_pool(goal: GoalKind, level: PerformanceLevel) -> &'static [&'static str] {
    match (goal, level) {
        (GoalKind::Cut, PerformanceLevel::Good) => CUT_GOOD,
        (GoalKind::Cut, PerformanceLevel::Ok) => CUT_OK,
        (GoalKind::Cut, PerformanceLevel::Bad) => CUT_BAD,
        (GoalKind::Bulk, PerformanceLevel::Good) => BULK_GOOD,
        (GoalKind::Bulk, PerformanceLevel::Ok) => BULK_OK,
        (GoalKind::Bulk, PerformanceLevel::Bad) => BULK_BAD,
        (GoalKind::Reverse, PerformanceLevel::Good) => REVERSE_GOOD,
        (GoalKind::Reverse, PerformanceLevel::Ok) => REVERSE_OK,
        (GoalKind::Reverse, PerformanceLevel::Bad) => REVERSE_BAD,
        (GoalKind::Maintenance, PerformanceLevel::Good) => MAINTENANCE_GOOD,
        (GoalKind::Maintenance, PerformanceLevel::Ok) => MAINTENANCE_OK,
        (GoalKind::Maintenance, PerformanceLevel::Bad) => MAINTENANCE_BAD,
    }
}

/// Chooses one message out of a pool.
pub trait MessagePicker {
    fn pick(&mut self, pool: &'static [&'static str]) -> &'static str;
}

/// Uniform random choice. Output is not reproducible unless built with
/// [`RandomPicker::seeded`].
pub struct RandomPicker {
    rng: StdRng,
}

impl RandomPicker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPicker {
    fn default() -> Self {
        Self::new()
    }
}

impl MessagePicker for RandomPicker {
    fn pick(&mut self, pool: &'static [&'static str]) -> &'static str {
        pool.choose(&mut self.rng).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Motivation {
    pub level: PerformanceLevel,
    pub message: &'static str,
    pub progress: f64,
    pub weekly_change: f64,
}

/// Classify the recent trend and pick an encouraging (or nudging) message.
pub fn motivational_message(
    progress: f64,
    goal: GoalKind,
    weekly_change: f64,
    picker: &mut dyn MessagePicker,
) -> Motivation {
    let level = classify_performance(goal, weekly_change);
    let message = picker.pick(message_pool(goal, level));
    Motivation {
        level,
        message,
        progress,
        weekly_change,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeightEntry;

    fn log_of(points: &[(i64, f64)]) -> WeightLog {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        WeightLog::from_entries(points.iter().map(|&(offset, kg)| WeightEntry {
            date: base + chrono::Duration::days(offset),
            weight_kg: kg,
            notes: String::new(),
            goal: GoalKind::Maintenance,
        }))
    }

    struct FirstPicker;

    impl MessagePicker for FirstPicker {
        fn pick(&mut self, pool: &'static [&'static str]) -> &'static str {
            pool[0]
        }
    }

    #[test]
    fn test_bmi_value() {
        assert!((bmi(70.0, 175.0) - 22.857).abs() < 0.01);
    }

    #[test]
    fn test_bmi_zero_height() {
        assert_eq!(bmi(70.0, 0.0), 0.0);
        assert_eq!(bmi(120.0, 0.0), 0.0);
        assert_eq!(bmi(70.0, -10.0), 0.0);
    }

    #[test]
    fn test_bmi_category_boundaries() {
        assert_eq!(bmi_category(18.49), BmiCategory::Underweight);
        assert_eq!(bmi_category(18.5), BmiCategory::Normal);
        assert_eq!(bmi_category(24.99), BmiCategory::Normal);
        assert_eq!(bmi_category(25.0), BmiCategory::Overweight);
        assert_eq!(bmi_category(29.99), BmiCategory::Overweight);
        assert_eq!(bmi_category(30.0), BmiCategory::Obese);
        assert_eq!(bmi_category(30.0).label(), "Obese");
        assert_eq!(bmi_category(22.0).color(), "#2ecc71");
    }

    #[test]
    fn test_goal_progress_zero_at_start() {
        assert_eq!(goal_progress(80.0, 75.0, Some(80.0)), 0.0);
        assert_eq!(goal_progress(80.0, 90.0, Some(80.0)), 0.0);
    }

    #[test]
    fn test_goal_progress_undefined_start_or_target() {
        assert_eq!(goal_progress(78.0, 75.0, None), 0.0);
        assert_eq!(goal_progress(78.0, 80.0, Some(80.0)), 0.0);
    }

    #[test]
    fn test_goal_progress_reaches_and_clamps_at_100() {
        assert!((goal_progress(75.0, 75.0, Some(80.0)) - 100.0).abs() < f64::EPSILON);
        assert!((goal_progress(70.0, 75.0, Some(80.0)) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_goal_progress_monotonic() {
        let mut last = -1.0;
        for step in 0..=10 {
            let current = 80.0 - f64::from(step) * 0.5;
            let p = goal_progress(current, 75.0, Some(80.0));
            assert!(p >= last);
            last = p;
        }
        assert!((goal_progress(77.5, 75.0, Some(80.0)) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_goal_progress_counts_movement_in_either_direction() {
        // Moving away from a lower target still registers as progress.
        assert!((goal_progress(82.5, 75.0, Some(80.0)) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_days_since_last_entry() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
        assert_eq!(days_since_last_entry(&WeightLog::new(), today), 0);
        assert_eq!(days_since_last_entry(&log_of(&[(0, 80.0), (7, 80.0)]), today), 3);
        assert_eq!(days_since_last_entry(&log_of(&[(10, 80.0)]), today), 0);
        assert_eq!(days_since_last_entry(&log_of(&[(30, 80.0)]), today), 0);
    }

    #[test]
    fn test_weekly_change_rate_sentinels() {
        assert_eq!(weekly_change_rate(&WeightLog::new()), 0.0);
        assert_eq!(weekly_change_rate(&log_of(&[(0, 70.0)])), 0.0);
    }

    #[test]
    fn test_weekly_change_rate_one_kg_per_week() {
        let log = log_of(&[(0, 70.0), (7, 71.0)]);
        assert!((weekly_change_rate(&log) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_weekly_change_rate_uses_last_28_entries() {
        // 40 daily entries; the first 12 are wildly different and must be ignored.
        let mut points: Vec<(i64, f64)> = (0..12).map(|d| (d, 120.0)).collect();
        points.extend((12..40).map(|d| (d, 80.0 - (d - 12) as f64 * 0.1)));
        let log = log_of(&points);
        // Window covers days 12..=39: 27 days, -2.7 kg → -0.7 kg/week
        assert!((weekly_change_rate(&log) + 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_classify_loss() {
        assert_eq!(classify_performance(GoalKind::Cut, -0.5), PerformanceLevel::Good);
        assert_eq!(classify_performance(GoalKind::Cut, -0.3), PerformanceLevel::Ok);
        assert_eq!(classify_performance(GoalKind::Cut, -0.1), PerformanceLevel::Ok);
        assert_eq!(classify_performance(GoalKind::Cut, 0.0), PerformanceLevel::Bad);
    }

    #[test]
    fn test_classify_gain() {
        assert_eq!(classify_performance(GoalKind::Bulk, 0.5), PerformanceLevel::Good);
        assert_eq!(classify_performance(GoalKind::Bulk, 0.3), PerformanceLevel::Ok);
        assert_eq!(classify_performance(GoalKind::Reverse, 0.1), PerformanceLevel::Ok);
        assert_eq!(classify_performance(GoalKind::Reverse, -0.2), PerformanceLevel::Bad);
    }

    #[test]
    fn test_classify_maintenance() {
        assert_eq!(classify_performance(GoalKind::Maintenance, 0.1), PerformanceLevel::Good);
        assert_eq!(classify_performance(GoalKind::Maintenance, -0.19), PerformanceLevel::Good);
        assert_eq!(classify_performance(GoalKind::Maintenance, -0.3), PerformanceLevel::Ok);
        assert_eq!(classify_performance(GoalKind::Maintenance, 0.5), PerformanceLevel::Bad);
    }

    #[test]
    fn test_every_pool_is_non_empty() {
        for goal in GoalKind::ALL {
            for level in [PerformanceLevel::Good, PerformanceLevel::Ok, PerformanceLevel::Bad] {
                assert!(!message_pool(goal, level).is_empty());
            }
        }
    }

    #[test]
    fn test_motivational_message_with_injected_picker() {
        let m = motivational_message(40.0, GoalKind::Cut, -0.6, &mut FirstPicker);
        assert_eq!(m.level, PerformanceLevel::Good);
        assert_eq!(m.message, message_pool(GoalKind::Cut, PerformanceLevel::Good)[0]);
        assert!((m.progress - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_random_picker_stays_in_pool() {
        let mut picker = RandomPicker::new();
        for _ in 0..20 {
            let m = motivational_message(0.0, GoalKind::Bulk, -1.0, &mut picker);
            assert_eq!(m.level, PerformanceLevel::Bad);
            assert!(message_pool(GoalKind::Bulk, PerformanceLevel::Bad).contains(&m.message));
        }
    }

    #[test]
    fn test_seeded_picker_is_reproducible() {
        let pool = message_pool(GoalKind::Maintenance, PerformanceLevel::Ok);
        let mut a = RandomPicker::seeded(7);
        let mut b = RandomPicker::seeded(7);
        for _ in 0..10 {
            assert_eq!(a.pick(pool), b.pick(pool));
        }
    }
}
