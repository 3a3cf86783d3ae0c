use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::log::WeightLog;
use crate::models::{Account, UserProfile, is_valid_username};
use crate::store::{AccountStore, WeightStore};
use crate::transfer::{ExportFormat, export_log, parse_weight_csv};

const LOG_FILE: &str = "weight_data.csv";
const PROFILE_FILE: &str = "user_profile.json";
const ACCOUNTS_FILE: &str = "accounts.json";

/// Flat-file backend:
///
/// ```text
/// <root>/accounts.json
/// <root>/users/<user>/weight_data.csv
/// <root>/users/<user>/user_profile.json
/// ```
pub struct FileStore {
    root: PathBuf,
}

/// On-disk account record; the username is the map key.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountRecord {
    password_hash: String,
    security_question: String,
    security_answer_hash: String,
    created_at: String,
}

impl FileStore {
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)
            .with_context(|| format!("Failed to create data directory: {}", root.display()))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn user_dir(&self, user: &str) -> Result<PathBuf> {
        if !is_valid_username(user) {
            bail!("Invalid user name '{user}'");
        }
        Ok(self.root.join("users").join(user))
    }

    fn read_accounts(&self) -> Result<BTreeMap<String, AccountRecord>> {
        let path = self.root.join(ACCOUNTS_FILE);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("Corrupt accounts file: {}", path.display()))
    }

    fn write_accounts(&self, accounts: &BTreeMap<String, AccountRecord>) -> Result<()> {
        let path = self.root.join(ACCOUNTS_FILE);
        let data = serde_json::to_string_pretty(accounts)?;
        fs::write(&path, data).with_context(|| format!("Failed to write {}", path.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
                .context("Failed to set accounts file permissions")?;
        }
        Ok(())
    }
}

impl WeightStore for FileStore {
    fn load_log(&self, user: &str) -> Result<WeightLog> {
        let path = self.user_dir(user)?.join(LOG_FILE);
        if !path.exists() {
            debug!(user, "no weight log on disk yet");
            return Ok(WeightLog::new());
        }
        let file =
            fs::File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
        let profile_goal = self.load_profile(user)?.goal;
        let parsed = parse_weight_csv(file, profile_goal)
            .with_context(|| format!("Corrupt weight log: {}", path.display()))?;
        Ok(WeightLog::from_entries(parsed.entries))
    }

    fn save_log(&self, user: &str, log: &WeightLog) -> Result<()> {
        let dir = self.user_dir(user)?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(LOG_FILE);
        let file = fs::File::create(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        export_log(log, ExportFormat::Csv, file)?;
        debug!(user, entries = log.len(), "saved weight log");
        Ok(())
    }

    fn load_profile(&self, user: &str) -> Result<UserProfile> {
        let path = self.user_dir(user)?.join(PROFILE_FILE);
        if !path.exists() {
            return Ok(UserProfile::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("Corrupt profile: {}", path.display()))
    }

    fn save_profile(&self, user: &str, profile: &UserProfile) -> Result<()> {
        let dir = self.user_dir(user)?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(PROFILE_FILE);
        fs::write(&path, serde_json::to_string_pretty(profile)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(user, "saved profile");
        Ok(())
    }
}

impl AccountStore for FileStore {
    fn get_account(&self, username: &str) -> Result<Option<Account>> {
        Ok(self.read_accounts()?.remove(username).map(|r| Account {
            username: username.to_string(),
            password_hash: r.password_hash,
            security_question: r.security_question,
            security_answer_hash: r.security_answer_hash,
            created_at: r.created_at,
        }))
    }

    fn create_account(&self, account: &Account) -> Result<()> {
        let mut accounts = self.read_accounts()?;
        if accounts.contains_key(&account.username) {
            bail!("Account '{}' already exists", account.username);
        }
        accounts.insert(account.username.clone(), AccountRecord::from(account));
        self.write_accounts(&accounts)
    }

    fn update_account(&self, account: &Account) -> Result<()> {
        let mut accounts = self.read_accounts()?;
        let Some(slot) = accounts.get_mut(&account.username) else {
            bail!("Account '{}' not found", account.username);
        };
        *slot = AccountRecord::from(account);
        self.write_accounts(&accounts)
    }
}

impl From<&Account> for AccountRecord {
    fn from(a: &Account) -> Self {
        Self {
            password_hash: a.password_hash.clone(),
            security_question: a.security_question.clone(),
            security_answer_hash: a.security_answer_hash.clone(),
            created_at: a.created_at.clone(),
        }
    }
}
