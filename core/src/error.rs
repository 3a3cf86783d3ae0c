use chrono::NaiveDate;
use thiserror::Error;

/// Reasons a manually entered weight is rejected. Nothing is written when
/// one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntryError {
    #[error("Weight must be between {min:.0} and {max:.0} kg (got {weight:.1})")]
    WeightOutOfRange { weight: f64, min: f64, max: f64 },

    #[error("Date {0} is in the future")]
    FutureDate(NaiveDate),

    #[error("An entry for {0} already exists (use --replace to overwrite it)")]
    DuplicateDate(NaiveDate),

    #[error(
        "Weight changed by {delta:.1} kg since the previous entry on {previous_date} \
         ({previous:.1} kg → {weight:.1} kg); changes over 5 kg are rejected"
    )]
    LargeJump {
        previous_date: NaiveDate,
        previous: f64,
        weight: f64,
        delta: f64,
    },
}

/// Profile edits that fail validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    #[error("Name must not be empty")]
    EmptyName,

    #[error("{field} must be between 30 and 300 kg (got {value:.1})")]
    WeightOutOfRange { field: &'static str, value: f64 },

    #[error("Height must be greater than 0 cm (got {0:.1})")]
    InvalidHeight(f64),
}

/// Which logical field an import column maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportField {
    Date,
    Weight,
}

impl ImportField {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Weight => "weight",
        }
    }

    /// Case-insensitive substrings that identify a column for this field.
    #[must_use]
    pub fn patterns(self) -> &'static [&'static str] {
        match self {
            Self::Date => &["date", "time"],
            Self::Weight => &["weight", "kg", "lbs"],
        }
    }
}

impl std::fmt::Display for ImportField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn describe_missing(missing: &[ImportField]) -> String {
    missing
        .iter()
        .map(|field| format!("{field} (header containing {})", field.patterns().join("/")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A CSV import failure. The whole file is rejected.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(
        "Missing required column(s): {}; found columns: [{}]",
        describe_missing(.missing),
        .found.join(", ")
    )]
    MissingColumns {
        found: Vec<String>,
        missing: Vec<ImportField>,
    },

    #[error("Ambiguous {field} column: [{}] all match; rename all but one", .candidates.join(", "))]
    AmbiguousColumn {
        field: ImportField,
        candidates: Vec<String>,
    },

    #[error("Row {row}: cannot parse date '{value}'")]
    InvalidDate { row: usize, value: String },

    #[error("Row {row}: invalid weight '{value}'")]
    InvalidWeight { row: usize, value: String },

    #[error("The file has no header row")]
    NoHeader,

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

impl ImportError {
    /// Required fields that could not be mapped, if this is a mapping failure.
    #[must_use]
    pub fn missing_fields(&self) -> &[ImportField] {
        match self {
            Self::MissingColumns { missing, .. } => missing,
            _ => &[],
        }
    }
}

/// Account errors. Login and reset failures collapse into
/// `InvalidCredentials` so callers cannot tell which field was wrong.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Username must be 3-32 characters of letters, digits, '_', '-' or '.'")]
    InvalidUsername,

    #[error("Username is already taken")]
    UsernameTaken,

    #[error("Password must be at least 8 characters and contain a letter and a digit")]
    WeakPassword,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Security question and answer must not be empty")]
    MissingSecurityAnswer,

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Not logged in. Run `heft account login <username>` first")]
    NotLoggedIn,

    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },
}
