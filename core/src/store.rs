use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::Database;
use crate::files::FileStore;
use crate::log::WeightLog;
use crate::models::{Account, UserProfile};

/// Per-user weight log and profile persistence.
///
/// Saves overwrite the stored copy wholesale. There is no locking: two
/// writers for the same user race and the last one wins.
pub trait WeightStore {
    /// An empty log when the user has never saved one.
    fn load_log(&self, user: &str) -> Result<WeightLog>;
    fn save_log(&self, user: &str, log: &WeightLog) -> Result<()>;
    /// The default profile when the user has never saved one.
    fn load_profile(&self, user: &str) -> Result<UserProfile>;
    fn save_profile(&self, user: &str, profile: &UserProfile) -> Result<()>;
}

pub trait AccountStore {
    fn get_account(&self, username: &str) -> Result<Option<Account>>;
    /// Fails if the username is already present.
    fn create_account(&self, account: &Account) -> Result<()>;
    /// Fails if the username is unknown.
    fn update_account(&self, account: &Account) -> Result<()>;
}

pub trait Store: WeightStore + AccountStore {}

impl<T: WeightStore + AccountStore> Store for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// CSV log + JSON profile per user, JSON accounts file.
    #[default]
    Files,
    /// A single SQLite database.
    Sqlite,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Files => f.write_str("files"),
            Self::Sqlite => f.write_str("sqlite"),
        }
    }
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "files" | "file" => Ok(Self::Files),
            "sqlite" | "db" => Ok(Self::Sqlite),
            _ => bail!("Invalid backend '{s}'. Use files or sqlite"),
        }
    }
}

/// Open the configured backend rooted at `data_dir`.
pub fn open_store(backend: Backend, data_dir: &Path) -> Result<Box<dyn Store>> {
    debug!(%backend, data_dir = %data_dir.display(), "opening store");
    Ok(match backend {
        Backend::Files => Box::new(FileStore::open(data_dir)?),
        Backend::Sqlite => Box::new(Database::open(&data_dir.join("heft.db"))?),
    })
}
