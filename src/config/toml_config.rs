use crate::domain::model::{
    BookingRules, ConflictPolicy, DEFAULT_DURATION_MINUTES, DEFAULT_MAX_DURATION_MINUTES,
    STANDARD_SLOT_TIMES,
};
use crate::utils::error::{BookingError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub booking: BookingSection,
    pub memory: Option<MemoryConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Hosted PostgREST + auth API.
    Postgrest,
    /// In-process store, optionally persisted to a JSON data file.
    #[default]
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingSection {
    pub default_duration_minutes: Option<i64>,
    pub max_duration_minutes: Option<i64>,
    pub conflict_policy: Option<ConflictPolicy>,
    pub allow_same_day: Option<bool>,
    pub verify_doctor: Option<bool>,
    pub slot_times: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub data_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

impl BookingConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BookingError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| BookingError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SUPABASE_ANON_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BookingError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        match self.backend.kind {
            BackendKind::Postgrest => {
                let url = validation::validate_required_field("backend.url", &self.backend.url)?;
                validation::validate_url("backend.url", url)?;
                let key =
                    validation::validate_required_field("backend.api_key", &self.backend.api_key)?;
                validation::validate_non_empty_string("backend.api_key", key)?;
                if key.contains("${") {
                    return Err(BookingError::InvalidConfigValueError {
                        field: "backend.api_key".to_string(),
                        value: key.clone(),
                        reason: "environment variable is not set".to_string(),
                    });
                }
            }
            BackendKind::Memory => {
                if let Some(path) = self.data_file() {
                    validation::validate_path("memory.data_file", path)?;
                    validation::validate_file_extension("memory.data_file", path, &["json"])?;
                }
            }
        }

        if let Some(timeout) = self.backend.timeout_seconds {
            validation::validate_range("backend.timeout_seconds", timeout, 1, 300)?;
        }

        let default_duration = self.default_duration_minutes();
        let max_duration = self.max_duration_minutes();
        validation::validate_range("booking.max_duration_minutes", max_duration, 1, 1440)?;
        validation::validate_range(
            "booking.default_duration_minutes",
            default_duration,
            1,
            max_duration,
        )?;

        if let Some(slot_times) = &self.booking.slot_times {
            for time in slot_times {
                validation::parse_slot_time("booking.slot_times", time).map_err(|_| {
                    BookingError::InvalidConfigValueError {
                        field: "booking.slot_times".to_string(),
                        value: time.clone(),
                        reason: "expected HH:MM".to_string(),
                    }
                })?;
            }
        }

        Ok(())
    }

    pub fn default_duration_minutes(&self) -> i64 {
        self.booking
            .default_duration_minutes
            .unwrap_or(DEFAULT_DURATION_MINUTES)
    }

    pub fn max_duration_minutes(&self) -> i64 {
        self.booking
            .max_duration_minutes
            .unwrap_or(DEFAULT_MAX_DURATION_MINUTES)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    pub fn data_file(&self) -> Option<&str> {
        self.memory.as_ref().and_then(|m| m.data_file.as_deref())
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }

    /// Booking rules after defaults are applied. Call `validate` first.
    pub fn rules(&self) -> Result<BookingRules> {
        let slot_times = match &self.booking.slot_times {
            Some(times) => times.clone(),
            None => STANDARD_SLOT_TIMES.iter().map(|t| t.to_string()).collect(),
        }
        .iter()
        .map(|t| validation::parse_slot_time("booking.slot_times", t))
        .collect::<Result<Vec<_>>>()?;

        Ok(BookingRules {
            default_duration_minutes: self.default_duration_minutes(),
            max_duration_minutes: self.max_duration_minutes(),
            conflict_policy: self.booking.conflict_policy.unwrap_or_default(),
            allow_same_day: self.booking.allow_same_day.unwrap_or(false),
            verify_doctor: self.booking.verify_doctor.unwrap_or(false),
            slot_times,
        })
    }
}

impl Validate for BookingConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
