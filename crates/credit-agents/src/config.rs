//! Process-wide configuration, loaded once at startup.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. Environment variables (`CREDIT_*`, plus `DEEPSEEK_API_KEY` for the key)
//! 2. Optional TOML file passed via `--config`
//! 3. Built-in defaults (DeepSeek chat endpoint, temperature 0.1, 600s timeout)
//!
//! There is no default credential. When no key is configured the placeholder
//! `not-configured` is sent, the oracle rejects it, and every evaluation fails
//! with `OracleUnavailable`.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use arbitration::{EvaluationMode, PromptLimits, TurnBudget};
use serde::Deserialize;
use tracing::warn;

const DEFAULT_MODEL: &str = "deepseek-chat";
const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";
/// Sent when no credential is configured. Never a real secret.
pub const API_KEY_PLACEHOLDER: &str = "not-configured";
const DEFAULT_TEMPERATURE: f64 = 0.1;
const DEFAULT_TIMEOUT_SECS: u64 = 600;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

const ENV_MODEL: &str = "CREDIT_ORACLE_MODEL";
const ENV_BASE_URL: &str = "CREDIT_ORACLE_BASE_URL";
const ENV_API_KEY: &str = "CREDIT_ORACLE_API_KEY";
const ENV_API_KEY_FALLBACK: &str = "DEEPSEEK_API_KEY";
const ENV_TEMPERATURE: &str = "CREDIT_ORACLE_TEMPERATURE";
const ENV_TIMEOUT_SECS: &str = "CREDIT_ORACLE_TIMEOUT_SECS";
const ENV_BIND_ADDR: &str = "CREDIT_BIND_ADDR";
const ENV_NORMALIZE: &str = "CREDIT_NORMALIZE_ALLOCATIONS";
const ENV_ENABLE_CORS: &str = "CREDIT_ENABLE_CORS";
const ENV_CLAIM_CHARS: &str = "CREDIT_CLAIM_CHARS";
const ENV_ARTIFACT_CHARS: &str = "CREDIT_ARTIFACT_CHARS";

/// Connection settings for the OpenAI-compatible text-generation backend.
#[derive(Clone)]
pub struct OracleConfig {
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub temperature: f64,
    pub timeout: Duration,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: API_KEY_PLACEHOLDER.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl OracleConfig {
    pub fn has_credential(&self) -> bool {
        !self.api_key.is_empty() && self.api_key != API_KEY_PLACEHOLDER
    }
}

// The key must never end up in logs.
impl fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field(
                "api_key",
                &if self.has_credential() {
                    "<redacted>"
                } else {
                    API_KEY_PLACEHOLDER
                },
            )
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Top-level configuration shared read-only by every request.
#[derive(Debug, Clone)]
pub struct CreditConfig {
    pub oracle: OracleConfig,
    pub limits: PromptLimits,
    pub group_budget: TurnBudget,
    pub single_budget: TurnBudget,
    /// Rescale group percentages to sum to 100 after extraction.
    pub normalize_allocations: bool,
    /// Allow browser frontends on any origin to call the HTTP API.
    pub enable_cors: bool,
    pub bind_addr: String,
}

impl Default for CreditConfig {
    fn default() -> Self {
        Self {
            oracle: OracleConfig::default(),
            limits: PromptLimits::default(),
            group_budget: TurnBudget::for_mode(EvaluationMode::Group),
            single_budget: TurnBudget::for_mode(EvaluationMode::Single),
            normalize_allocations: false,
            enable_cors: true,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

/// Shape of the optional TOML file. Every field may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub oracle: FileOracleConfig,
    pub claim_chars: Option<usize>,
    pub artifact_chars: Option<usize>,
    pub group_max_turns: Option<u32>,
    pub single_max_turns: Option<u32>,
    pub normalize_allocations: Option<bool>,
    pub enable_cors: Option<bool>,
    pub bind_addr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileOracleConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub temperature: Option<f64>,
    pub timeout_secs: Option<u64>,
}

impl CreditConfig {
    /// Defaults, then the TOML file (if any), then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = path {
            config.apply_file(&FileConfig::from_file(path)?);
        }
        config.apply_env_from(|key| std::env::var(key).ok());
        if !config.oracle.has_credential() {
            warn!(
                "No oracle credential configured; set {ENV_API_KEY} or {ENV_API_KEY_FALLBACK}"
            );
        }
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
        Ok(config)
    }

    pub fn budget_for(&self, mode: EvaluationMode) -> TurnBudget {
        match mode {
            EvaluationMode::Group => self.group_budget,
            EvaluationMode::Single => self.single_budget,
        }
    }

    pub fn apply_file(&mut self, file: &FileConfig) {
        let oracle = &file.oracle;
        if let Some(v) = &oracle.model {
            self.oracle.model = v.clone();
        }
        if let Some(v) = &oracle.base_url {
            self.oracle.base_url = v.clone();
        }
        if let Some(v) = &oracle.api_key {
            self.oracle.api_key = v.clone();
        }
        if let Some(v) = oracle.temperature {
            self.oracle.temperature = v;
        }
        if let Some(v) = oracle.timeout_secs {
            self.oracle.timeout = Duration::from_secs(v);
        }
        if let Some(v) = file.claim_chars {
            self.limits.claim_chars = v;
        }
        if let Some(v) = file.artifact_chars {
            self.limits.artifact_chars = v;
        }
        if let Some(v) = file.group_max_turns {
            self.group_budget = TurnBudget::new(v);
        }
        if let Some(v) = file.single_max_turns {
            self.single_budget = TurnBudget::new(v);
        }
        if let Some(v) = file.normalize_allocations {
            self.normalize_allocations = v;
        }
        if let Some(v) = file.enable_cors {
            self.enable_cors = v;
        }
        if let Some(v) = &file.bind_addr {
            self.bind_addr = v.clone();
        }
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_MODEL) {
            self.oracle.model = v;
        }
        if let Some(v) = get(ENV_BASE_URL) {
            self.oracle.base_url = v;
        }
        if let Some(v) = get(ENV_API_KEY).or_else(|| get(ENV_API_KEY_FALLBACK)) {
            self.oracle.api_key = v;
        }
        if let Some(v) = parse_env(&get, ENV_TEMPERATURE) {
            self.oracle.temperature = v;
        }
        if let Some(v) = parse_env(&get, ENV_TIMEOUT_SECS) {
            self.oracle.timeout = Duration::from_secs(v);
        }
        if let Some(v) = parse_env(&get, ENV_CLAIM_CHARS) {
            self.limits.claim_chars = v;
        }
        if let Some(v) = parse_env(&get, ENV_ARTIFACT_CHARS) {
            self.limits.artifact_chars = v;
        }
        if let Some(v) = parse_env(&get, ENV_NORMALIZE) {
            self.normalize_allocations = v;
        }
        if let Some(v) = parse_env(&get, ENV_ENABLE_CORS) {
            self.enable_cors = v;
        }
        if let Some(v) = get(ENV_BIND_ADDR) {
            self.bind_addr = v;
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.limits.validate()?;
        if !(0.0..=2.0).contains(&self.oracle.temperature) {
            return Err(format!(
                "temperature must be in [0, 2], got {}",
                self.oracle.temperature
            ));
        }
        if self.oracle.timeout.is_zero() {
            return Err("oracle timeout must be > 0".to_string());
        }
        if self.oracle.model.trim().is_empty() {
            return Err("oracle model must not be empty".to_string());
        }
        if self.oracle.base_url.trim().is_empty() {
            return Err("oracle base_url must not be empty".to_string());
        }
        // Group mode may need both reviewers; single mode only one.
        self.group_budget.validate(2)?;
        self.single_budget.validate(1)?;
        Ok(())
    }
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse config TOML")
    }
}

fn parse_env<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = get(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn default_config_validates() {
        let cfg = CreditConfig::default();
        cfg.validate().expect("default config should be valid");
        assert_eq!(cfg.group_budget.max_turns, 6);
        assert_eq!(cfg.single_budget.max_turns, 10);
        assert!(!cfg.oracle.has_credential());
    }

    #[test]
    fn env_overrides_defaults() {
        let mut cfg = CreditConfig::default();
        cfg.apply_env_from(env(&[
            (ENV_MODEL, "local-model"),
            (ENV_API_KEY_FALLBACK, "sk-fallback"),
            (ENV_TIMEOUT_SECS, "30"),
            (ENV_NORMALIZE, "true"),
            (ENV_ENABLE_CORS, "false"),
        ]));
        assert_eq!(cfg.oracle.model, "local-model");
        assert_eq!(cfg.oracle.api_key, "sk-fallback");
        assert_eq!(cfg.oracle.timeout, Duration::from_secs(30));
        assert!(cfg.normalize_allocations);
        assert!(!cfg.enable_cors);
    }

    #[test]
    fn primary_key_env_wins_over_fallback() {
        let mut cfg = CreditConfig::default();
        cfg.apply_env_from(env(&[
            (ENV_API_KEY, "sk-primary"),
            (ENV_API_KEY_FALLBACK, "sk-fallback"),
        ]));
        assert_eq!(cfg.oracle.api_key, "sk-primary");
    }

    #[test]
    fn bad_numeric_env_is_ignored() {
        let mut cfg = CreditConfig::default();
        cfg.apply_env_from(env(&[(ENV_TEMPERATURE, "warm")]));
        assert_eq!(cfg.oracle.temperature, DEFAULT_TEMPERATURE);
    }

    #[test]
    fn file_then_env_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "group_max_turns = 8\nclaim_chars = 100\n\n[oracle]\nmodel = \"file-model\"\ntemperature = 0.0"
        )
        .unwrap();

        let mut cfg = CreditConfig::default();
        cfg.apply_file(&FileConfig::from_file(file.path()).unwrap());
        assert_eq!(cfg.oracle.model, "file-model");
        assert_eq!(cfg.group_budget.max_turns, 8);
        assert_eq!(cfg.limits.claim_chars, 100);

        cfg.apply_env_from(env(&[(ENV_MODEL, "env-model")]));
        assert_eq!(cfg.oracle.model, "env-model");
        assert_eq!(cfg.oracle.temperature, 0.0);
    }

    #[test]
    fn unknown_file_key_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_rounds = 3").unwrap();
        assert!(FileConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn invalid_values_rejected() {
        let mut cfg = CreditConfig::default();
        cfg.oracle.temperature = 3.0;
        assert!(cfg.validate().is_err());

        let mut cfg = CreditConfig::default();
        cfg.group_budget = TurnBudget::new(3);
        assert!(cfg.validate().is_err());

        let mut cfg = CreditConfig::default();
        cfg.oracle.timeout = Duration::ZERO;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut cfg = OracleConfig::default();
        cfg.api_key = "sk-very-secret".into();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
