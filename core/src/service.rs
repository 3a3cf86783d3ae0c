use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::analytics::{self, HistogramBin, TimeRange, TrendPoint, WeightStats};
use crate::auth;
use crate::db::Database;
use crate::error::AuthError;
use crate::metrics::{self, BmiCategory, MessagePicker, Motivation};
use crate::models::{Account, NewAccount, NewWeightEntry, ProfileUpdate, UserProfile, WeightEntry};
use crate::store::{Backend, Store, open_store};
use crate::transfer::{self, ExportFormat, ImportSummary};

/// Entries shown in the dashboard's "recent" list.
pub const RECENT_ENTRIES: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct AddWeightOutcome {
    pub entry: WeightEntry,
    /// The entry previously stored for the same date, if any.
    pub replaced: Option<WeightEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BmiReading {
    pub value: f64,
    pub category: BmiCategory,
    pub label: &'static str,
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub profile: UserProfile,
    pub latest: Option<WeightEntry>,
    pub stats: Option<WeightStats>,
    pub bmi: Option<BmiReading>,
    pub goal_progress: f64,
    pub days_since_last_entry: i64,
    pub weekly_change: f64,
    /// Newest first.
    pub recent: Vec<WeightEntry>,
    pub motivation: Motivation,
}

#[derive(Debug, Clone, Serialize)]
pub struct Analytics {
    pub range: TimeRange,
    pub stats: Option<WeightStats>,
    pub trend: Vec<TrendPoint>,
    pub histogram: Vec<HistogramBin>,
}

/// Every user-facing operation, over whichever backend was configured.
pub struct HeftService {
    store: Box<dyn Store>,
}

impl HeftService {
    #[must_use]
    pub fn new(store: Box<dyn Store>) -> Self {
        Self { store }
    }

    pub fn open(backend: Backend, data_dir: &Path) -> Result<Self> {
        Ok(Self::new(open_store(backend, data_dir)?))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Box::new(Database::open_in_memory()?)))
    }

    // --- Weight ---

    /// Validate and store a manual entry, then sync the profile's current
    /// weight and goal to it.
    pub fn add_weight(
        &self,
        user: &str,
        entry: NewWeightEntry,
        today: NaiveDate,
        allow_replace: bool,
    ) -> Result<AddWeightOutcome> {
        let mut log = self.store.load_log(user)?;
        log.validate_new_entry(&entry, today, allow_replace)?;

        let entry = WeightEntry::from(entry);
        let replaced = log.upsert(entry.clone());
        self.store.save_log(user, &log)?;

        let mut profile = self.store.load_profile(user)?;
        profile.current_weight = entry.weight_kg;
        profile.goal = entry.goal;
        self.store.save_profile(user, &profile)?;

        Ok(AddWeightOutcome { entry, replaced })
    }

    /// Returns the removed entry, or `None` if nothing was logged on `date`.
    pub fn delete_weight(&self, user: &str, date: NaiveDate) -> Result<Option<WeightEntry>> {
        let mut log = self.store.load_log(user)?;
        let removed = log.remove(date);
        if removed.is_some() {
            self.store.save_log(user, &log)?;
        }
        Ok(removed)
    }

    pub fn get_weight(&self, user: &str, date: NaiveDate) -> Result<Option<WeightEntry>> {
        Ok(self.store.load_log(user)?.get(date).cloned())
    }

    /// Most recent `limit` entries (all when `None`), oldest first.
    pub fn history(&self, user: &str, limit: Option<usize>) -> Result<Vec<WeightEntry>> {
        let log = self.store.load_log(user)?;
        let entries = match limit {
            Some(n) => log.tail(n),
            None => log.entries(),
        };
        Ok(entries.to_vec())
    }

    // --- Profile ---

    pub fn profile(&self, user: &str) -> Result<UserProfile> {
        self.store.load_profile(user)
    }

    pub fn update_profile(&self, user: &str, update: &ProfileUpdate) -> Result<UserProfile> {
        let profile = self.store.load_profile(user)?.with_update(update)?;
        self.store.save_profile(user, &profile)?;
        Ok(profile)
    }

    // --- Views ---

    pub fn dashboard(
        &self,
        user: &str,
        today: NaiveDate,
        picker: &mut dyn MessagePicker,
    ) -> Result<Dashboard> {
        let profile = self.store.load_profile(user)?;
        let log = self.store.load_log(user)?;

        let latest = log.last().cloned();
        let current = latest.as_ref().map_or(profile.current_weight, |e| e.weight_kg);
        let bmi = profile.height_cm.filter(|h| *h > 0.0).map(|height| {
            let value = metrics::bmi(current, height);
            let category = metrics::bmi_category(value);
            BmiReading {
                value,
                category,
                label: category.label(),
                color: category.color(),
            }
        });
        let goal_progress = metrics::goal_progress(
            current,
            profile.target_weight,
            log.first().map(|e| e.weight_kg),
        );
        let weekly_change = metrics::weekly_change_rate(&log);
        let motivation =
            metrics::motivational_message(goal_progress, profile.goal, weekly_change, picker);

        Ok(Dashboard {
            latest,
            stats: WeightStats::from_entries(log.entries()),
            bmi,
            goal_progress,
            days_since_last_entry: metrics::days_since_last_entry(&log, today),
            weekly_change,
            recent: log.tail(RECENT_ENTRIES).iter().rev().cloned().collect(),
            motivation,
            profile,
        })
    }

    pub fn analytics(
        &self,
        user: &str,
        range: TimeRange,
        today: NaiveDate,
        window: usize,
        bins: usize,
    ) -> Result<Analytics> {
        let log = self.store.load_log(user)?;
        let entries = log.in_range(range, today);
        Ok(Analytics {
            range,
            stats: WeightStats::from_entries(entries),
            trend: analytics::moving_average(entries, window),
            histogram: analytics::histogram(entries, bins),
        })
    }

    // --- Import / export ---

    /// Merge a CSV file into the user's log. Nothing is written on a dry run
    /// or when any row fails to parse.
    pub fn import_csv<R: Read>(&self, user: &str, reader: R, dry_run: bool) -> Result<ImportSummary> {
        let goal = self.store.load_profile(user)?.goal;
        let parsed = transfer::parse_weight_csv(reader, goal).context("Import failed")?;

        let mut log = self.store.load_log(user)?;
        let summary = transfer::merge_import(&mut log, parsed, dry_run);
        if !dry_run {
            self.store.save_log(user, &log)?;
        }
        info!(
            user,
            dry_run,
            added = summary.entries_added,
            replaced = summary.entries_replaced,
            "imported weight csv"
        );
        Ok(summary)
    }

    /// Returns the number of entries written.
    pub fn export<W: Write>(&self, user: &str, format: ExportFormat, writer: W) -> Result<usize> {
        let log = self.store.load_log(user)?;
        let count = transfer::export_log(&log, format, writer)?;
        info!(user, count, format = format.extension(), "exported weight log");
        Ok(count)
    }

    // --- Accounts ---

    pub fn signup(&self, new: &NewAccount) -> Result<Account, AuthError> {
        auth::create_account(self.store.as_ref(), new)
    }

    pub fn login(&self, username: &str, password: &str) -> Result<Account, AuthError> {
        auth::authenticate(self.store.as_ref(), username, password)
    }

    pub fn security_question(&self, username: &str) -> Result<String, AuthError> {
        auth::security_question(self.store.as_ref(), username)
    }

    pub fn reset_password(
        &self,
        username: &str,
        answer: &str,
        new_password: &str,
        confirm: &str,
    ) -> Result<(), AuthError> {
        auth::reset_password(self.store.as_ref(), username, answer, new_password, confirm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EntryError;
    use crate::metrics::PerformanceLevel;
    use crate::models::GoalKind;

    struct FirstPicker;

    impl MessagePicker for FirstPicker {
        fn pick(&mut self, pool: &'static [&'static str]) -> &'static str {
            pool[0]
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn entry(date: NaiveDate, kg: f64) -> NewWeightEntry {
        NewWeightEntry {
            date,
            weight_kg: kg,
            notes: String::new(),
            goal: GoalKind::Cut,
        }
    }

    #[test]
    fn test_add_weight_updates_profile() {
        let svc = HeftService::in_memory().unwrap();
        let outcome = svc.add_weight("sam", entry(day(1), 82.4), day(1), false).unwrap();
        assert!(outcome.replaced.is_none());

        let profile = svc.profile("sam").unwrap();
        assert!((profile.current_weight - 82.4).abs() < f64::EPSILON);
        assert_eq!(profile.goal, GoalKind::Cut);
    }

    #[test]
    fn test_add_weight_rejections_leave_log_untouched() {
        let svc = HeftService::in_memory().unwrap();
        svc.add_weight("sam", entry(day(1), 82.0), day(10), false).unwrap();

        let err = svc.add_weight("sam", entry(day(2), 90.0), day(10), false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EntryError>(),
            Some(EntryError::LargeJump { .. })
        ));
        let err = svc.add_weight("sam", entry(day(11), 82.0), day(10), false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EntryError>(),
            Some(EntryError::FutureDate(_))
        ));
        let err = svc.add_weight("sam", entry(day(1), 81.0), day(10), false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EntryError>(),
            Some(EntryError::DuplicateDate(_))
        ));

        assert_eq!(svc.history("sam", None).unwrap().len(), 1);
        assert!((svc.profile("sam").unwrap().current_weight - 82.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_add_weight_replace_keeps_one_row_per_date() {
        let svc = HeftService::in_memory().unwrap();
        svc.add_weight("sam", entry(day(1), 82.0), day(1), false).unwrap();
        let outcome = svc.add_weight("sam", entry(day(1), 81.5), day(1), true).unwrap();

        assert!((outcome.replaced.unwrap().weight_kg - 82.0).abs() < f64::EPSILON);
        let history = svc.history("sam", None).unwrap();
        assert_eq!(history.len(), 1);
        assert!((history[0].weight_kg - 81.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_delete_and_get_weight() {
        let svc = HeftService::in_memory().unwrap();
        svc.add_weight("sam", entry(day(1), 82.0), day(5), false).unwrap();
        assert!(svc.get_weight("sam", day(1)).unwrap().is_some());

        assert!(svc.delete_weight("sam", day(1)).unwrap().is_some());
        assert!(svc.delete_weight("sam", day(1)).unwrap().is_none());
        assert!(svc.get_weight("sam", day(1)).unwrap().is_none());
    }

    #[test]
    fn test_history_limit_keeps_latest() {
        let svc = HeftService::in_memory().unwrap();
        for (d, kg) in [(1, 82.0), (2, 81.8), (3, 81.5)] {
            svc.add_weight("sam", entry(day(d), kg), day(3), false).unwrap();
        }
        let recent = svc.history("sam", Some(2)).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].date, day(2));
    }

    #[test]
    fn test_update_profile_validates() {
        let svc = HeftService::in_memory().unwrap();
        let updated = svc
            .update_profile(
                "sam",
                &ProfileUpdate {
                    height_cm: Some(180.0),
                    target_weight: Some(75.0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.height_cm, Some(180.0));

        let err = svc
            .update_profile(
                "sam",
                &ProfileUpdate {
                    target_weight: Some(10.0),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(err.to_string().contains("Target weight"));
        assert!((svc.profile("sam").unwrap().target_weight - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_dashboard_on_empty_log() {
        let svc = HeftService::in_memory().unwrap();
        let dash = svc.dashboard("sam", day(1), &mut FirstPicker).unwrap();
        assert!(dash.latest.is_none());
        assert!(dash.stats.is_none());
        assert!(dash.bmi.is_none());
        assert_eq!(dash.days_since_last_entry, 0);
        assert!(dash.goal_progress.abs() < f64::EPSILON);
        assert!(dash.recent.is_empty());
    }

    #[test]
    fn test_dashboard_metrics() {
        let svc = HeftService::in_memory().unwrap();
        svc.update_profile(
            "sam",
            &ProfileUpdate {
                target_weight: Some(76.0),
                height_cm: Some(180.0),
                ..Default::default()
            },
        )
        .unwrap();
        svc.add_weight("sam", entry(day(1), 80.0), day(1), false).unwrap();
        svc.add_weight("sam", entry(day(8), 79.0), day(8), false).unwrap();

        let dash = svc.dashboard("sam", day(10), &mut FirstPicker).unwrap();
        assert_eq!(dash.latest.as_ref().unwrap().date, day(8));
        assert_eq!(dash.days_since_last_entry, 2);
        assert!((dash.weekly_change + 1.0).abs() < 1e-9);
        assert!((dash.goal_progress - 25.0).abs() < 1e-9);
        let bmi = dash.bmi.unwrap();
        assert!((bmi.value - 79.0 / (1.8 * 1.8)).abs() < 1e-9);
        assert_eq!(bmi.label, "Normal");
        assert_eq!(dash.motivation.level, PerformanceLevel::Good);
        assert_eq!(dash.recent[0].date, day(8));
        assert_eq!(dash.stats.unwrap().count, 2);
    }

    #[test]
    fn test_analytics_respects_range() {
        let svc = HeftService::in_memory().unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        for (date, kg) in [
            (NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 84.0),
            (NaiveDate::from_ymd_opt(2024, 6, 20).unwrap(), 82.0),
            (NaiveDate::from_ymd_opt(2024, 6, 27).unwrap(), 81.0),
        ] {
            svc.add_weight("sam", entry(date, kg), today, true).unwrap();
        }

        let month = svc.analytics("sam", TimeRange::Month, today, 7, 5).unwrap();
        assert_eq!(month.stats.unwrap().count, 2);
        assert_eq!(month.trend.len(), 2);

        let all = svc.analytics("sam", TimeRange::All, today, 7, 5).unwrap();
        assert_eq!(all.stats.unwrap().count, 3);
        assert_eq!(all.histogram.iter().map(|b| b.count).sum::<usize>(), 3);
    }

    #[test]
    fn test_import_then_export() {
        let svc = HeftService::in_memory().unwrap();
        let csv = "Date,Weight (kg)\n2024-03-01,80.0\n2024-03-02,79.6\n";

        let dry = svc.import_csv("sam", csv.as_bytes(), true).unwrap();
        assert!(dry.dry_run);
        assert_eq!(dry.entries_added, 2);
        assert!(svc.history("sam", None).unwrap().is_empty());

        let summary = svc.import_csv("sam", csv.as_bytes(), false).unwrap();
        assert_eq!(summary.entries_added, 2);

        let mut out = Vec::new();
        assert_eq!(svc.export("sam", ExportFormat::Csv, &mut out).unwrap(), 2);
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("date,weight,notes,goal\n2024-03-01"));
    }

    #[test]
    fn test_import_failure_writes_nothing() {
        let svc = HeftService::in_memory().unwrap();
        let err = svc
            .import_csv("sam", "when,notes\n2024-03-01,x\n".as_bytes(), false)
            .unwrap_err();
        assert!(format!("{err:#}").contains("weight"));
        assert!(svc.history("sam", None).unwrap().is_empty());
    }

    #[test]
    fn test_account_facade() {
        let svc = HeftService::in_memory().unwrap();
        svc.signup(&NewAccount {
            username: "sam".to_string(),
            password: "hunter22x".to_string(),
            confirm_password: "hunter22x".to_string(),
            security_question: "First pet?".to_string(),
            security_answer: "Rex".to_string(),
        })
        .unwrap();
        assert!(svc.login("sam", "hunter22x").is_ok());
        assert_eq!(svc.security_question("sam").unwrap(), "First pet?");
        svc.reset_password("sam", "rex", "newpass99", "newpass99").unwrap();
        assert!(svc.login("sam", "newpass99").is_ok());
    }
}
