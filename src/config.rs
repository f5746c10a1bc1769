//! Triage configuration: auto-close gate, confidence thresholds, and the
//! SLA/quota knobs administrators tune out-of-band. Loaded from TOML with
//! env overrides; a missing file means hardcoded defaults.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

// --- env defaults & names ---
pub const DEFAULT_CONFIG_PATH: &str = "config/triage.toml";
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.8;

pub const ENV_CONFIG_PATH: &str = "TRIAGE_CONFIG_PATH";
pub const ENV_AUTO_CLOSE: &str = "AUTO_CLOSE_ENABLED";
pub const ENV_CONFIDENCE_THRESHOLD: &str = "CONFIDENCE_THRESHOLD";

fn default_threshold() -> f32 {
    DEFAULT_CONFIDENCE_THRESHOLD
}
fn default_billing() -> f32 {
    0.8
}
fn default_tech() -> f32 {
    0.75
}
fn default_shipping() -> f32 {
    0.8
}
fn default_other() -> f32 {
    0.9
}
fn default_sla_hours() -> u32 {
    24
}
fn default_max_tickets_per_user() -> u32 {
    10
}

/// Per-category override values. Carried as configuration data for admin
/// surfaces; the auto-close decision consults the global threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryThresholds {
    #[serde(default = "default_billing")]
    pub billing: f32,
    #[serde(default = "default_tech")]
    pub tech: f32,
    #[serde(default = "default_shipping")]
    pub shipping: f32,
    #[serde(default = "default_other")]
    pub other: f32,
}

impl Default for CategoryThresholds {
    fn default() -> Self {
        Self {
            billing: default_billing(),
            tech: default_tech(),
            shipping: default_shipping(),
            other: default_other(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageConfig {
    #[serde(default)]
    pub auto_close_enabled: bool,
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f32,
    #[serde(default)]
    pub category_thresholds: CategoryThresholds,
    #[serde(default = "default_sla_hours")]
    pub sla_hours: u32,
    #[serde(default = "default_max_tickets_per_user")]
    pub max_tickets_per_user: u32,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            auto_close_enabled: false,
            confidence_threshold: default_threshold(),
            category_thresholds: CategoryThresholds::default(),
            sla_hours: default_sla_hours(),
            max_tickets_per_user: default_max_tickets_per_user(),
        }
    }
}

impl TriageConfig {
    /// Parse from a TOML string, then sanitize out-of-range values back to
    /// their defaults.
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let mut cfg: TriageConfig = toml::from_str(raw)?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Load from `TRIAGE_CONFIG_PATH` (default `config/triage.toml`); a
    /// missing or unreadable file is not an error — defaults apply. Env
    /// overrides (`AUTO_CLOSE_ENABLED`, `CONFIDENCE_THRESHOLD`) win last.
    pub fn load() -> Self {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut cfg = match fs::read_to_string(&path) {
            Ok(content) => Self::from_toml_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "invalid triage config, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        };

        if let Ok(v) = std::env::var(ENV_AUTO_CLOSE) {
            cfg.auto_close_enabled = v == "true" || v == "1";
        }
        if let Some(t) = parse_threshold_env(std::env::var(ENV_CONFIDENCE_THRESHOLD).ok()) {
            cfg.confidence_threshold = t;
        }

        cfg
    }

    fn sanitize(&mut self) {
        if !(0.0..=1.0).contains(&self.confidence_threshold) || !self.confidence_threshold.is_finite()
        {
            self.confidence_threshold = default_threshold();
        }
        let ct = &mut self.category_thresholds;
        if !(0.0..=1.0).contains(&ct.billing) {
            ct.billing = default_billing();
        }
        if !(0.0..=1.0).contains(&ct.tech) {
            ct.tech = default_tech();
        }
        if !(0.0..=1.0).contains(&ct.shipping) {
            ct.shipping = default_shipping();
        }
        if !(0.0..=1.0).contains(&ct.other) {
            ct.other = default_other();
        }
        if self.sla_hours == 0 {
            self.sla_hours = default_sla_hours();
        }
        if self.max_tickets_per_user == 0 {
            self.max_tickets_per_user = default_max_tickets_per_user();
        }
    }
}

// parse optional float env and clamp to <0.0..=1.0>
fn parse_threshold_env(raw: Option<String>) -> Option<f32> {
    raw.and_then(|s| s.trim().parse::<f32>().ok())
        .map(|v| v.clamp(0.0, 1.0))
}

/// Thread-safe config handle. Each triage run reads a snapshot at decision
/// time; administrators may swap values out-of-band between runs. No
/// transactional isolation against concurrent edits is promised.
#[derive(Clone, Default)]
pub struct ConfigHandle {
    inner: Arc<RwLock<TriageConfig>>,
}

impl ConfigHandle {
    pub fn new(cfg: TriageConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(cfg)),
        }
    }

    pub fn snapshot(&self) -> TriageConfig {
        self.inner
            .read()
            .expect("config handle lock poisoned")
            .clone()
    }

    pub fn update(&self, cfg: TriageConfig) {
        let mut guard = self.inner.write().expect("config handle lock poisoned");
        *guard = cfg;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults() {
        let cfg = TriageConfig::default();
        assert!(!cfg.auto_close_enabled);
        assert!((cfg.confidence_threshold - 0.8).abs() < 1e-6);
        assert!((cfg.category_thresholds.tech - 0.75).abs() < 1e-6);
        assert!((cfg.category_thresholds.other - 0.9).abs() < 1e-6);
        assert_eq!(cfg.sla_hours, 24);
        assert_eq!(cfg.max_tickets_per_user, 10);
    }

    #[test]
    fn toml_parse_and_sanitize() {
        let cfg = TriageConfig::from_toml_str(
            r#"
auto_close_enabled = true
confidence_threshold = 1.7
sla_hours = 48

[category_thresholds]
billing = 0.85
tech = -0.2
"#,
        )
        .unwrap();

        assert!(cfg.auto_close_enabled);
        // out-of-range values fall back to defaults
        assert!((cfg.confidence_threshold - 0.8).abs() < 1e-6);
        assert!((cfg.category_thresholds.billing - 0.85).abs() < 1e-6);
        assert!((cfg.category_thresholds.tech - 0.75).abs() < 1e-6);
        assert_eq!(cfg.sla_hours, 48);
    }

    #[test]
    #[serial]
    fn env_overrides_win() {
        std::env::set_var(ENV_CONFIG_PATH, "/nonexistent/triage.toml");
        std::env::set_var(ENV_AUTO_CLOSE, "true");
        std::env::set_var(ENV_CONFIDENCE_THRESHOLD, "0.65");

        let cfg = TriageConfig::load();
        assert!(cfg.auto_close_enabled);
        assert!((cfg.confidence_threshold - 0.65).abs() < 1e-6);

        std::env::remove_var(ENV_CONFIG_PATH);
        std::env::remove_var(ENV_AUTO_CLOSE);
        std::env::remove_var(ENV_CONFIDENCE_THRESHOLD);
    }

    #[test]
    #[serial]
    fn missing_file_means_defaults() {
        std::env::set_var(ENV_CONFIG_PATH, "/nonexistent/triage.toml");
        let cfg = TriageConfig::load();
        assert_eq!(cfg, TriageConfig::default());
        std::env::remove_var(ENV_CONFIG_PATH);
    }
}
