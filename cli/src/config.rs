use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use heft_core::session::SessionContext;
use heft_core::store::Backend;

const CONFIG_FILE: &str = "config.json";
const SESSION_FILE: &str = "session.json";

pub struct Config {
    pub data_dir: PathBuf,
    pub backend: Backend,
    pub require_login: bool,
    pub default_user: String,
    pub log_level: String,
}

/// Contents of `config.json`; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    backend: Option<Backend>,
    require_login: Option<bool>,
    default_user: Option<String>,
    log_level: Option<String>,
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => bail!("Invalid value for {name}: '{value}'. Use true or false"),
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from `env` lookups, `config.json`, and defaults,
    /// in that order of precedence.
    fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = match env("HEFT_DATA_DIR").filter(|d| !d.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => ProjectDirs::from("", "", "heft")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let file = read_file_config(&data_dir.join(CONFIG_FILE))?;

        let backend = match env("HEFT_BACKEND") {
            Some(b) => b.parse()?,
            None => file.backend.unwrap_or_default(),
        };
        let require_login = match env("HEFT_REQUIRE_LOGIN") {
            Some(v) => parse_bool("HEFT_REQUIRE_LOGIN", &v)?,
            None => file.require_login.unwrap_or(false),
        };

        Ok(Config {
            data_dir,
            backend,
            require_login,
            default_user: file.default_user.unwrap_or_else(|| "default".to_string()),
            log_level: file.log_level.unwrap_or_else(|| "warn".to_string()),
        })
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }

    /// The persisted session, or a logged-out one when none was saved.
    pub fn load_session(&self) -> Result<SessionContext> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(SessionContext::new());
        }
        let data = std::fs::read_to_string(&path).context("Failed to read session file")?;
        serde_json::from_str(&data)
            .with_context(|| format!("Corrupt session file: {}", path.display()))
    }

    pub fn save_session(&self, session: &SessionContext) -> Result<()> {
        let path = self.session_path();
        std::fs::write(&path, serde_json::to_string_pretty(session)?)
            .context("Failed to write session file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to set session file permissions")?;
        }
        Ok(())
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("Invalid config file: {}", path.display()))
}
