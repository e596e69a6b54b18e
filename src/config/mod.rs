use crate::errors::{AppError, AppResult};
use crate::utils::time::parse_time;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database")]
    pub database: String,

    /// Constant prefix of every printed badge / QR code.
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,

    /// Same-direction scans closer than this are treated as hardware double reads.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: i64,

    #[serde(default = "default_rule_cache_ttl")]
    pub rule_cache_ttl_secs: u64,

    // Fallback values used when the `global_rule` row has not been authored yet.
    #[serde(default = "default_school_start")]
    pub school_start: String,
    #[serde(default = "default_late_threshold")]
    pub late_threshold_minutes: i64,
    #[serde(default = "default_absent_threshold")]
    pub absent_threshold_minutes: i64,
    #[serde(default = "default_dismissal_time")]
    pub dismissal_time: String,
    #[serde(default = "default_early_exit")]
    pub early_exit_minutes: i64,
    #[serde(default = "default_late_exit")]
    pub late_exit_minutes: i64,

    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_database() -> String {
    Config::database_file().to_string_lossy().to_string()
}
fn default_id_prefix() -> String {
    "SCH".to_string()
}
fn default_debounce_ms() -> i64 {
    2000
}
fn default_rule_cache_ttl() -> u64 {
    300
}
fn default_school_start() -> String {
    "07:30".to_string()
}
fn default_late_threshold() -> i64 {
    15
}
fn default_absent_threshold() -> i64 {
    120
}
fn default_dismissal_time() -> String {
    "16:00".to_string()
}
fn default_early_exit() -> i64 {
    30
}
fn default_late_exit() -> i64 {
    60
}
fn default_log_filter() -> String {
    "campustap=info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            id_prefix: default_id_prefix(),
            debounce_ms: default_debounce_ms(),
            rule_cache_ttl_secs: default_rule_cache_ttl(),
            school_start: default_school_start(),
            late_threshold_minutes: default_late_threshold(),
            absent_threshold_minutes: default_absent_threshold(),
            dismissal_time: default_dismissal_time(),
            early_exit_minutes: default_early_exit(),
            late_exit_minutes: default_late_exit(),
            log_filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Return the standard configuration directory (`~/.campustap`).
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".campustap")
    }

    /// Return the full path of the config file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("campustap.conf")
    }

    /// Return the full path of the SQLite database
    pub fn database_file() -> PathBuf {
        Self::config_dir().join("campustap.sqlite")
    }

    /// Load configuration from file, or return defaults if not found.
    pub fn load() -> AppResult<Self> {
        Self::load_from(&Self::config_file())
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&content)?;
        Ok(cfg)
    }

    /// Check the time-of-day fields and thresholds, returning every problem found.
    pub fn check(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for (name, value) in [
            ("school_start", &self.school_start),
            ("dismissal_time", &self.dismissal_time),
        ] {
            if parse_time(value).is_none() {
                problems.push(format!("{name}: '{value}' is not a valid HH:MM time"));
            }
        }

        if self.absent_threshold_minutes < self.late_threshold_minutes {
            problems.push(
                "absent_threshold_minutes must be >= late_threshold_minutes".to_string(),
            );
        }
        if self.debounce_ms < 0 {
            problems.push("debounce_ms must not be negative".to_string());
        }
        if self.id_prefix.trim().is_empty() {
            problems.push("id_prefix must not be empty".to_string());
        }

        problems
    }

    /// Initialize configuration and database files
    pub fn init_all(custom_db: Option<String>, is_test: bool) -> AppResult<Config> {
        let dir = Self::config_dir();
        fs::create_dir_all(&dir)?;

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

        let config = Config {
            database: db_path.to_string_lossy().to_string(),
            ..Config::default()
        };

        if !is_test {
            let yaml = serde_yaml::to_string(&config)?;
            let mut file = fs::File::create(Self::config_file())?;
            file.write_all(yaml.as_bytes())?;
        }

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Config(format!("cannot create {}: {e}", parent.display())))?;
        }

        Ok(config)
    }
}
