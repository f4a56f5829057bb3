use crate::errors::{AppError, AppResult};
use crate::models::user::WorkSchedule;
use crate::utils::time::{parse_time_arg, parse_timezone};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Keys a complete configuration file carries.
pub const CONFIG_FIELDS: &[&str] = &[
    "database",
    "mail_dir",
    "internal_domains",
    "noise_filters",
    "max_response_gap_days",
    "backfill_days",
    "fetch_timeout_secs",
    "store_timeout_secs",
    "default_timezone",
    "default_work_start",
    "default_work_end",
    "separator_char",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_mail_dir")]
    pub mail_dir: String,
    #[serde(default = "default_internal_domains")]
    pub internal_domains: Vec<String>,
    #[serde(default = "default_noise_filters")]
    pub noise_filters: Vec<String>,
    #[serde(default = "default_max_gap_days")]
    pub max_response_gap_days: i64,
    #[serde(default = "default_backfill_days")]
    pub backfill_days: i64,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_store_timeout")]
    pub store_timeout_secs: u64,
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    #[serde(default = "default_work_start")]
    pub default_work_start: String,
    #[serde(default = "default_work_end")]
    pub default_work_end: String,
    #[serde(default = "default_separator_char")]
    pub separator_char: String,
}

fn default_database() -> String {
    Config::database_file().to_string_lossy().to_string()
}
fn default_mail_dir() -> String {
    Config::config_dir().join("mail").to_string_lossy().to_string()
}
fn default_internal_domains() -> Vec<String> {
    [
        "lumiere.education",
        "ladderinternships.com",
        "veritasai.com",
        "horizoninspires.com",
        "youngfounderslab.org",
        "wallstreetguide.net",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_noise_filters() -> Vec<String> {
    [
        "mailer-daemon",
        "postmaster",
        "mixmax.com",
        "notifications@",
        "noreply",
        "no-reply",
        "stellaconnect",
        "calendar-notification",
        "newsletter",
        "stripe.com",
        "calsavers.com",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_max_gap_days() -> i64 {
    7
}
fn default_backfill_days() -> i64 {
    90
}
fn default_fetch_timeout() -> u64 {
    60
}
fn default_store_timeout() -> u64 {
    30
}
fn default_timezone() -> String {
    "America/New_York".to_string()
}
fn default_work_start() -> String {
    "09:00".to_string()
}
fn default_work_end() -> String {
    "17:00".to_string()
}
fn default_separator_char() -> String {
    "-".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            mail_dir: default_mail_dir(),
            internal_domains: default_internal_domains(),
            noise_filters: default_noise_filters(),
            max_response_gap_days: default_max_gap_days(),
            backfill_days: default_backfill_days(),
            fetch_timeout_secs: default_fetch_timeout(),
            store_timeout_secs: default_store_timeout(),
            default_timezone: default_timezone(),
            default_work_start: default_work_start(),
            default_work_end: default_work_end(),
            separator_char: default_separator_char(),
        }
    }
}

impl Config {
    /// Return the standard configuration directory depending on the platform
    pub fn config_dir() -> PathBuf {
        if cfg!(target_os = "windows") {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("rreplytracker")
        } else {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".rreplytracker")
        }
    }

    /// Return the full path of the config file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("rreplytracker.conf")
    }

    /// Return the full path of the SQLite database
    pub fn database_file() -> PathBuf {
        Self::config_dir().join("rreplytracker.sqlite")
    }

    /// Load configuration from file, or return defaults if not found
    pub fn load() -> AppResult<Self> {
        Self::load_from(&Self::config_file())
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|_| AppError::ConfigLoad)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> AppResult<Self> {
        // An empty file deserializes to unit, not to a mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| AppError::Config(e.to_string()))
    }

    pub fn to_yaml(&self) -> AppResult<String> {
        serde_yaml::to_string(self).map_err(|_| AppError::ConfigSave)
    }

    /// Initialize configuration and database files. Returns the DB path.
    pub fn init_all(custom_db: Option<String>, is_test: bool) -> AppResult<PathBuf> {
        let dir = Self::config_dir();

        // DB name: user provided or default
        let db_path = match custom_db {
            Some(name) => {
                let p = Path::new(&name);
                if p.is_absolute() {
                    p.to_path_buf()
                } else {
                    dir.join(p)
                }
            }
            None => Self::database_file(),
        };

        // Write config file
        if !is_test {
            fs::create_dir_all(&dir)?;

            let config = Config {
                database: db_path.to_string_lossy().to_string(),
                ..Self::load()?
            };
            let yaml = config.to_yaml()?;
            let mut file = fs::File::create(Self::config_file())?;
            file.write_all(yaml.as_bytes())?;
            log::info!("config written to {}", Self::config_file().display());
        }

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        Ok(db_path)
    }

    /// Fields absent from the given YAML document.
    pub fn missing_fields(content: &str) -> AppResult<Vec<&'static str>> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|e| AppError::Config(e.to_string()))?;

        let Some(map) = value.as_mapping() else {
            return Ok(CONFIG_FIELDS.to_vec());
        };

        Ok(CONFIG_FIELDS
            .iter()
            .copied()
            .filter(|k| !map.contains_key(serde_yaml::Value::String(k.to_string())))
            .collect())
    }

    /// Semantic problems with the loaded values.
    pub fn problems(&self) -> Vec<String> {
        let mut out = Vec::new();

        if let Err(e) = self.default_schedule() {
            out.push(e.to_string());
        }
        if self.max_response_gap_days <= 0 {
            out.push("max_response_gap_days must be positive".into());
        }
        if self.backfill_days <= 0 {
            out.push("backfill_days must be positive".into());
        }
        if self.fetch_timeout_secs == 0 {
            out.push("fetch_timeout_secs must be positive".into());
        }
        if self.internal_domains.is_empty() {
            out.push("internal_domains is empty: every sender will look external".into());
        }

        out
    }

    /// Work schedule for users added without explicit hours.
    pub fn default_schedule(&self) -> AppResult<WorkSchedule> {
        Ok(WorkSchedule {
            work_start: parse_time_arg(&self.default_work_start)?,
            work_end: parse_time_arg(&self.default_work_end)?,
            timezone: parse_timezone(&self.default_timezone)?,
            exclude_weekends: true,
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}
