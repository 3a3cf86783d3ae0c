use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::log::WeightLog;
use crate::models::{Account, GoalKind, UserProfile, WeightEntry};
use crate::store::{AccountStore, WeightStore};

/// SQLite backend. All users share one database file.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS weight_entries (
                    user TEXT NOT NULL,
                    date TEXT NOT NULL,
                    weight_kg REAL NOT NULL CHECK (weight_kg > 0),
                    notes TEXT NOT NULL DEFAULT '',
                    goal TEXT NOT NULL DEFAULT 'maintenance',
                    PRIMARY KEY (user, date)
                );

                CREATE TABLE IF NOT EXISTS profiles (
                    user TEXT PRIMARY KEY NOT NULL,
                    name TEXT NOT NULL,
                    goal TEXT NOT NULL,
                    target_weight REAL NOT NULL,
                    current_weight REAL NOT NULL,
                    height_cm REAL,
                    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
                );

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS accounts (
                    username TEXT PRIMARY KEY NOT NULL,
                    password_hash TEXT NOT NULL,
                    security_question TEXT NOT NULL,
                    security_answer_hash TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                PRAGMA user_version = 2;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn weight_entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<WeightEntry> {
        let date_str: String = row.get(0)?;
        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let goal_str: String = row.get(3)?;
        Ok(WeightEntry {
            date,
            weight_kg: row.get(1)?,
            notes: row.get(2)?,
            goal: goal_str.parse().unwrap_or_default(),
        })
    }

    fn account_from_row(row: &rusqlite::Row) -> rusqlite::Result<Account> {
        Ok(Account {
            username: row.get(0)?,
            password_hash: row.get(1)?,
            security_question: row.get(2)?,
            security_answer_hash: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl WeightStore for Database {
    fn load_log(&self, user: &str) -> Result<WeightLog> {
        let mut stmt = self.conn.prepare(
            "SELECT date, weight_kg, notes, goal
             FROM weight_entries WHERE user = ?1 ORDER BY date",
        )?;
        let entries = stmt
            .query_map(params![user], Self::weight_entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(user, entries = entries.len(), "loaded weight log");
        Ok(WeightLog::from_entries(entries))
    }

    fn save_log(&self, user: &str, log: &WeightLog) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM weight_entries WHERE user = ?1", params![user])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO weight_entries (user, date, weight_kg, notes, goal)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for e in log {
                stmt.execute(params![
                    user,
                    e.date.format("%Y-%m-%d").to_string(),
                    e.weight_kg,
                    e.notes,
                    e.goal.as_str(),
                ])?;
            }
        }
        tx.commit()?;
        debug!(user, entries = log.len(), "saved weight log");
        Ok(())
    }

    fn load_profile(&self, user: &str) -> Result<UserProfile> {
        let row = self
            .conn
            .query_row(
                "SELECT name, goal, target_weight, current_weight, height_cm
                 FROM profiles WHERE user = ?1",
                params![user],
                |row| {
                    let goal: String = row.get(1)?;
                    Ok(UserProfile {
                        name: row.get(0)?,
                        goal: goal.parse::<GoalKind>().unwrap_or_default(),
                        target_weight: row.get(2)?,
                        current_weight: row.get(3)?,
                        height_cm: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row.unwrap_or_default())
    }

    fn save_profile(&self, user: &str, profile: &UserProfile) -> Result<()> {
        self.conn.execute(
            "INSERT INTO profiles (user, name, goal, target_weight, current_weight, height_cm, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
             ON CONFLICT(user) DO UPDATE SET
                name = excluded.name,
                goal = excluded.goal,
                target_weight = excluded.target_weight,
                current_weight = excluded.current_weight,
                height_cm = excluded.height_cm,
                updated_at = excluded.updated_at",
            params![
                user,
                profile.name,
                profile.goal.as_str(),
                profile.target_weight,
                profile.current_weight,
                profile.height_cm,
            ],
        )?;
        debug!(user, "saved profile");
        Ok(())
    }
}

impl AccountStore for Database {
    fn get_account(&self, username: &str) -> Result<Option<Account>> {
        let account = self
            .conn
            .query_row(
                "SELECT username, password_hash, security_question, security_answer_hash, created_at
                 FROM accounts WHERE username = ?1",
                params![username],
                Self::account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    fn create_account(&self, account: &Account) -> Result<()> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO accounts
                (username, password_hash, security_question, security_answer_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                account.username,
                account.password_hash,
                account.security_question,
                account.security_answer_hash,
                account.created_at,
            ],
        )?;
        if inserted == 0 {
            bail!("Account '{}' already exists", account.username);
        }
        Ok(())
    }

    fn update_account(&self, account: &Account) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE accounts SET password_hash = ?2, security_question = ?3, security_answer_hash = ?4
             WHERE username = ?1",
            params![
                account.username,
                account.password_hash,
                account.security_question,
                account.security_answer_hash,
            ],
        )?;
        if rows == 0 {
            bail!("Account '{}' not found", account.username);
        }
        Ok(())
    }
}
