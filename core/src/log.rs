use chrono::NaiveDate;
use serde::Serialize;

use crate::analytics::TimeRange;
use crate::error::EntryError;
use crate::models::{MAX_JUMP_KG, MAX_WEIGHT_KG, MIN_WEIGHT_KG, NewWeightEntry, WeightEntry};

/// One user's weight history.
///
/// Entries are kept sorted by date ascending and there is at most one entry
/// per date. Every constructor and mutator preserves both properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WeightLog {
    entries: Vec<WeightEntry>,
}

impl WeightLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from entries in any order. When two entries share a date
    /// the one appearing later in `entries` is kept.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = WeightEntry>) -> Self {
        let mut log = Self::new();
        for entry in entries {
            log.upsert(entry);
        }
        log
    }

    /// Insert `entry`, replacing any entry already logged for the same date.
    /// Returns the replaced entry.
    pub fn upsert(&mut self, entry: WeightEntry) -> Option<WeightEntry> {
        match self.entries.binary_search_by_key(&entry.date, |e| e.date) {
            Ok(idx) => Some(std::mem::replace(&mut self.entries[idx], entry)),
            Err(idx) => {
                self.entries.insert(idx, entry);
                None
            }
        }
    }

    pub fn remove(&mut self, date: NaiveDate) -> Option<WeightEntry> {
        let idx = self.entries.binary_search_by_key(&date, |e| e.date).ok()?;
        Some(self.entries.remove(idx))
    }

    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<&WeightEntry> {
        self.entries
            .binary_search_by_key(&date, |e| e.date)
            .ok()
            .map(|idx| &self.entries[idx])
    }

    #[must_use]
    pub fn entries(&self) -> &[WeightEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&WeightEntry> {
        self.entries.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&WeightEntry> {
        self.entries.last()
    }

    /// The closest entry strictly before `date`.
    #[must_use]
    pub fn previous_before(&self, date: NaiveDate) -> Option<&WeightEntry> {
        let idx = self.entries.partition_point(|e| e.date < date);
        idx.checked_sub(1).map(|i| &self.entries[i])
    }

    /// The last `n` entries, oldest first.
    #[must_use]
    pub fn tail(&self, n: usize) -> &[WeightEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Entries dated on or after the range's cutoff relative to `today`.
    #[must_use]
    pub fn in_range(&self, range: TimeRange, today: NaiveDate) -> &[WeightEntry] {
        match range.cutoff(today) {
            Some(cutoff) => {
                let start = self.entries.partition_point(|e| e.date < cutoff);
                &self.entries[start..]
            }
            None => &self.entries,
        }
    }

    /// Check a manual entry against this log before it is written.
    pub fn validate_new_entry(
        &self,
        entry: &NewWeightEntry,
        today: NaiveDate,
        allow_replace: bool,
    ) -> Result<(), EntryError> {
        if !(MIN_WEIGHT_KG..=MAX_WEIGHT_KG).contains(&entry.weight_kg) {
            return Err(EntryError::WeightOutOfRange {
                weight: entry.weight_kg,
                min: MIN_WEIGHT_KG,
                max: MAX_WEIGHT_KG,
            });
        }
        if entry.date > today {
            return Err(EntryError::FutureDate(entry.date));
        }
        if !allow_replace && self.get(entry.date).is_some() {
            return Err(EntryError::DuplicateDate(entry.date));
        }
        if let Some(previous) = self.previous_before(entry.date) {
            let delta = (entry.weight_kg - previous.weight_kg).abs();
            if delta > MAX_JUMP_KG {
                return Err(EntryError::LargeJump {
                    previous_date: previous.date,
                    previous: previous.weight_kg,
                    weight: entry.weight_kg,
                    delta,
                });
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a WeightLog {
    type Item = &'a WeightEntry;
    type IntoIter = std::slice::Iter<'a, WeightEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
