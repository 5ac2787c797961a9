//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Default meditation length
//! - Hydration reminder interval and glass size
//! - Screen-time limit and warning threshold
//! - Pomodoro durations and round counts
//! - Daily targets used by the wellness score
//!
//! Configuration is stored at `~/.config/wellroom/config.toml`. Values here
//! only seed engines on first load; once an engine has persisted its own
//! record, that record wins.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::{ConfigError, ValidationError};
use crate::timer::PomodoroSettings;

/// Meditation countdown configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeditationConfig {
    #[serde(default = "default_meditation_minutes")]
    pub default_minutes: u32,
}

/// Hydration reminder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HydrationConfig {
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,
    /// Amount credited by a plain "drink" action.
    #[serde(default = "default_glass_ml")]
    pub glass_ml: u32,
}

/// Screen-time tracker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenTimeConfig {
    #[serde(default = "default_limit_minutes")]
    pub limit_minutes: u32,
    #[serde(default = "default_warn_at_percent")]
    pub warn_at_percent: u32,
}

/// Pomodoro configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PomodoroConfig {
    #[serde(default = "default_focus_minutes")]
    pub focus_minutes: u32,
    #[serde(default = "default_short_break")]
    pub short_break_minutes: u32,
    #[serde(default = "default_long_break")]
    pub long_break_minutes: u32,
    #[serde(default = "default_long_break_interval")]
    pub long_break_interval: u32,
    #[serde(default = "default_total_rounds")]
    pub total_rounds: u32,
    #[serde(default = "default_true")]
    pub auto_start_next: bool,
}

/// Daily targets consumed by the wellness score. The screen-time target is
/// the usage limit itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetsConfig {
    #[serde(default = "default_meditation_minutes")]
    pub meditation_minutes: u32,
    #[serde(default = "default_water_ml")]
    pub water_ml: u32,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Attempt native notifications. The in-app toast is always shown.
    #[serde(default = "default_true")]
    pub native_enabled: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/wellroom/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub meditation: MeditationConfig,
    #[serde(default)]
    pub hydration: HydrationConfig,
    #[serde(default)]
    pub screen_time: ScreenTimeConfig,
    #[serde(default)]
    pub pomodoro: PomodoroConfig,
    #[serde(default)]
    pub targets: TargetsConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

// Default functions
fn default_meditation_minutes() -> u32 {
    10
}
fn default_interval_minutes() -> u32 {
    30
}
fn default_glass_ml() -> u32 {
    250
}
fn default_limit_minutes() -> u32 {
    120
}
fn default_warn_at_percent() -> u32 {
    80
}
fn default_focus_minutes() -> u32 {
    25
}
fn default_short_break() -> u32 {
    5
}
fn default_long_break() -> u32 {
    15
}
fn default_long_break_interval() -> u32 {
    4
}
fn default_total_rounds() -> u32 {
    4
}
fn default_water_ml() -> u32 {
    2000
}
fn default_true() -> bool {
    true
}

impl Default for MeditationConfig {
    fn default() -> Self {
        Self {
            default_minutes: default_meditation_minutes(),
        }
    }
}

impl Default for HydrationConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            glass_ml: default_glass_ml(),
        }
    }
}

impl Default for ScreenTimeConfig {
    fn default() -> Self {
        Self {
            limit_minutes: default_limit_minutes(),
            warn_at_percent: default_warn_at_percent(),
        }
    }
}

impl Default for PomodoroConfig {
    fn default() -> Self {
        Self {
            focus_minutes: default_focus_minutes(),
            short_break_minutes: default_short_break(),
            long_break_minutes: default_long_break(),
            long_break_interval: default_long_break_interval(),
            total_rounds: default_total_rounds(),
            auto_start_next: true,
        }
    }
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            meditation_minutes: default_meditation_minutes(),
            water_ml: default_water_ml(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            native_enabled: true,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|dir| dir.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("config.toml"),
                message: e.to_string(),
            })
    }

    /// Load from disk or return (and write) the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Parse and validate TOML content.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let cfg: Config =
            toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        cfg.validate()
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Ok(cfg)
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.clone(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without persisting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result fails validation. `self` is unchanged on error.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let next: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        next.validate().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        *self = next;
        Ok(())
    }

    /// Set a config value by key and persist. Returns error if key is unknown.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Reject values no engine would accept at its setter boundary.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let positive = [
            ("meditation.default_minutes", self.meditation.default_minutes),
            ("hydration.interval_minutes", self.hydration.interval_minutes),
            ("hydration.glass_ml", self.hydration.glass_ml),
            ("screen_time.limit_minutes", self.screen_time.limit_minutes),
            ("pomodoro.focus_minutes", self.pomodoro.focus_minutes),
            ("pomodoro.short_break_minutes", self.pomodoro.short_break_minutes),
            ("pomodoro.long_break_minutes", self.pomodoro.long_break_minutes),
            ("pomodoro.long_break_interval", self.pomodoro.long_break_interval),
            ("pomodoro.total_rounds", self.pomodoro.total_rounds),
        ];
        for (field, value) in positive {
            ValidationError::require_positive(field, value as f64)?;
        }
        let warn = self.screen_time.warn_at_percent;
        if !(1..=100).contains(&warn) {
            return Err(ValidationError::OutOfRange {
                field: "screen_time.warn_at_percent",
                value: warn as f64,
                min: 1.0,
                max: 100.0,
            });
        }
        Ok(())
    }

    /// Settings handed to the pomodoro state machine.
    pub fn pomodoro_settings(&self) -> PomodoroSettings {
        PomodoroSettings {
            focus_secs: u64::from(self.pomodoro.focus_minutes) * 60,
            short_break_secs: u64::from(self.pomodoro.short_break_minutes) * 60,
            long_break_secs: u64::from(self.pomodoro.long_break_minutes) * 60,
            long_break_interval: self.pomodoro.long_break_interval,
            total_rounds: self.pomodoro.total_rounds,
            auto_start_next: self.pomodoro.auto_start_next,
        }
    }
}
