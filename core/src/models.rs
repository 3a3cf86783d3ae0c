use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

/// Lower and upper bounds accepted for a manually entered weight, in kg.
pub const MIN_WEIGHT_KG: f64 = 30.0;
pub const MAX_WEIGHT_KG: f64 = 300.0;

/// Largest accepted change from the previous entry, in kg.
pub const MAX_JUMP_KG: f64 = 5.0;

pub const KG_PER_LB: f64 = 0.453_592;
pub const LBS_PER_KG: f64 = 2.204_62;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalKind {
    #[default]
    #[serde(alias = "maintain")]
    Maintenance,
    #[serde(alias = "weight_loss", alias = "loss")]
    Cut,
    #[serde(alias = "weight_gain", alias = "gain")]
    Bulk,
    Reverse,
}

/// Which way the scale is supposed to move for a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalDirection {
    Loss,
    Gain,
    Maintain,
}

impl GoalKind {
    pub const ALL: [GoalKind; 4] = [Self::Maintenance, Self::Cut, Self::Bulk, Self::Reverse];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Maintenance => "maintenance",
            Self::Cut => "cut",
            Self::Bulk => "bulk",
            Self::Reverse => "reverse",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Maintenance => "Maintain current weight and body composition",
            Self::Cut => "Lose weight and reduce body fat",
            Self::Bulk => "Gain weight and build muscle mass",
            Self::Reverse => "Gradual weight gain for muscle building",
        }
    }

    #[must_use]
    pub fn direction(self) -> GoalDirection {
        match self {
            Self::Cut => GoalDirection::Loss,
            Self::Bulk | Self::Reverse => GoalDirection::Gain,
            Self::Maintenance => GoalDirection::Maintain,
        }
    }
}

impl fmt::Display for GoalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "maintenance" | "maintain" => Ok(Self::Maintenance),
            "cut" | "weight_loss" | "loss" => Ok(Self::Cut),
            "bulk" | "weight_gain" | "gain" => Ok(Self::Bulk),
            "reverse" => Ok(Self::Reverse),
            _ => bail!("Invalid goal '{s}'. Use maintenance, cut, bulk or reverse"),
        }
    }
}

// --- Weight entries ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub date: NaiveDate,
    #[serde(rename = "weight")]
    pub weight_kg: f64,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub goal: GoalKind,
}

#[derive(Debug, Clone)]
pub struct NewWeightEntry {
    pub date: NaiveDate,
    pub weight_kg: f64,
    pub notes: String,
    pub goal: GoalKind,
}

impl From<NewWeightEntry> for WeightEntry {
    fn from(entry: NewWeightEntry) -> Self {
        Self {
            date: entry.date,
            weight_kg: entry.weight_kg,
            notes: entry.notes.trim().to_string(),
            goal: entry.goal,
        }
    }
}

// --- Profile ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub goal: GoalKind,
    pub target_weight: f64,
    pub current_weight: f64,
    #[serde(rename = "height", default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: "User".to_string(),
            goal: GoalKind::Maintenance,
            target_weight: 85.0,
            current_weight: 85.0,
            height_cm: None,
        }
    }
}

/// Partial profile edit; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub goal: Option<GoalKind>,
    pub target_weight: Option<f64>,
    pub current_weight: Option<f64>,
    pub height_cm: Option<f64>,
}

impl UserProfile {
    /// Apply `update` to a copy of this profile, validating every changed field.
    pub fn with_update(&self, update: &ProfileUpdate) -> Result<Self, ProfileError> {
        let mut next = self.clone();
        if let Some(ref name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ProfileError::EmptyName);
            }
            next.name = name.to_string();
        }
        if let Some(goal) = update.goal {
            next.goal = goal;
        }
        if let Some(target) = update.target_weight {
            check_profile_weight("Target weight", target)?;
            next.target_weight = target;
        }
        if let Some(current) = update.current_weight {
            check_profile_weight("Current weight", current)?;
            next.current_weight = current;
        }
        if let Some(height) = update.height_cm {
            if height <= 0.0 || !height.is_finite() {
                return Err(ProfileError::InvalidHeight(height));
            }
            next.height_cm = Some(height);
        }
        Ok(next)
    }
}

fn check_profile_weight(field: &'static str, value: f64) -> Result<(), ProfileError> {
    if (MIN_WEIGHT_KG..=MAX_WEIGHT_KG).contains(&value) {
        Ok(())
    } else {
        Err(ProfileError::WeightOutOfRange { field, value })
    }
}

// --- Accounts ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password_hash: String,
    pub security_question: String,
    pub security_answer_hash: String,
    pub created_at: String,
}

/// Sign-up form contents. Secrets are hashed before anything is stored.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub security_question: String,
    pub security_answer: String,
}

/// Usernames double as path components in the file backend, so keep them boring.
#[must_use]
pub fn is_valid_username(username: &str) -> bool {
    (3..=32).contains(&username.len())
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !username.starts_with('.')
}
