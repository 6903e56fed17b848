//! # Configuration Management Module
//!
//! Settings for the quiz engine, loaded from a TOML file.
//!
//! ## Configuration Structure
//!
//! - [`GameConfig`] - Encounter rules (lives, mana, XP payouts, rewards)
//! - [`StorageConfig`] - Profile database location
//! - [`QuestionsConfig`] - Question bank location
//! - [`ScoreConfig`] - Remote score endpoint
//! - [`LoggingConfig`] - Logging settings
//!
//! ## Usage
//!
//! ```rust,no_run
//! use quizquest::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("Max lives: {}", config.game.max_lives);
//!     Config::create_default("config.toml").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [game]
//! max_lives = 4
//! max_mana = 5
//! xp_low = 10
//! xp_high = 30
//!
//! [score]
//! enabled = true
//! endpoint = "http://127.0.0.1:8000"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

use crate::quiz::EncounterRules;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub questions: QuestionsConfig,
    #[serde(default)]
    pub score: ScoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub max_lives: u32,
    pub max_mana: u32,
    /// XP for a correct answer given while an ability is active.
    pub xp_low: u32,
    /// XP for an unassisted correct answer.
    pub xp_high: u32,
    /// Correct answers needed to clear a phase.
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: u32,
    /// Coins granted for clearing a phase.
    #[serde(default = "default_coin_bonus")]
    pub coin_bonus: u32,
    /// Pause between the final answer and the results screen (ms).
    #[serde(default = "default_resolve_delay_ms")]
    pub resolve_delay_ms: u64,
}

fn default_pass_threshold() -> u32 {
    3
}

fn default_coin_bonus() -> u32 {
    25
}

fn default_resolve_delay_ms() -> u64 {
    1500
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_lives: 4,
            max_mana: 5,
            xp_low: 10,
            xp_high: 30,
            pass_threshold: default_pass_threshold(),
            coin_bonus: default_coin_bonus(),
            resolve_delay_ms: default_resolve_delay_ms(),
        }
    }
}

impl GameConfig {
    pub fn rules(&self) -> EncounterRules {
        EncounterRules {
            max_lives: self.max_lives,
            max_mana: self.max_mana,
            xp_low: self.xp_low,
            xp_high: self.xp_high,
            pass_threshold: self.pass_threshold,
            coin_bonus: self.coin_bonus,
            resolve_delay: Duration::from_millis(self.resolve_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Optional override for the Sled profile database; defaults to `<data_dir>/profiles`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_db_path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            profile_db_path: None,
        }
    }
}

impl StorageConfig {
    pub fn profile_db(&self) -> PathBuf {
        match &self.profile_db_path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(&self.data_dir).join("profiles"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionsConfig {
    pub bank_path: String,
}

impl Default for QuestionsConfig {
    fn default() -> Self {
        Self {
            bank_path: "./data/questions.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreConfig {
    /// Enable/disable pushing XP to the score endpoint
    pub enabled: bool,
    /// Base URL of the local score API
    pub endpoint: String,
    /// HTTP client timeout in seconds
    pub timeout_seconds: u32,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://127.0.0.1:8000".to_string(),
            timeout_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("quizquest.log".to_string()),
        }
    }
}

impl LoggingConfig {
    /// Parse `level`, falling back to `Info` for unknown values.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or_else(|_| {
            eprintln!("Invalid log level '{}', defaulting to info", self.level);
            log::LevelFilter::Info
        })
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let game = &self.game;
        if game.max_lives == 0 {
            return Err(anyhow!("game.max_lives must be at least 1"));
        }
        if game.xp_low > game.xp_high {
            return Err(anyhow!(
                "game.xp_low ({}) must not exceed game.xp_high ({})",
                game.xp_low,
                game.xp_high
            ));
        }
        if self.score.enabled && self.score.endpoint.trim().is_empty() {
            return Err(anyhow!("score.endpoint is required when score sync is enabled"));
        }
        Ok(())
    }
}
