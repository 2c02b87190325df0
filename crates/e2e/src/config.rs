//! Harness configuration

use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shopcheck_common::{money::DEFAULT_PRECISION, CartOracle};

use crate::error::{E2eError, E2eResult};
use crate::overlay::{default_signatures, ObstructionSignature, OverlayGuard};
use crate::playwright::PlaywrightConfig;
use crate::runner::Credentials;
use crate::session::Timeouts;

/// Harness configuration, usually `shopcheck.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Storefront root, without a trailing slash
    pub base_url: String,

    pub timeouts: TimeoutConfig,

    pub overlay: OverlayConfig,

    pub oracle: OracleConfig,

    /// Fixture account for `account: fixture` scenarios
    pub account: Credentials,

    pub browser: PlaywrightConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "https://automationexercise.com".to_string(),
            timeouts: TimeoutConfig::default(),
            overlay: OverlayConfig::default(),
            oracle: OracleConfig::default(),
            account: Credentials::default(),
            browser: PlaywrightConfig::default(),
        }
    }
}

/// Timeouts in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub landmark_ms: u64,
    pub dismiss_ms: u64,
    pub poll_interval_ms: u64,
    pub retry_backoff_ms: u64,
    pub navigation_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self::from(Timeouts::default())
    }
}

impl From<Timeouts> for TimeoutConfig {
    fn from(t: Timeouts) -> Self {
        Self {
            landmark_ms: t.landmark.as_millis() as u64,
            dismiss_ms: t.dismiss.as_millis() as u64,
            poll_interval_ms: t.poll_interval.as_millis() as u64,
            retry_backoff_ms: t.retry_backoff.as_millis() as u64,
            navigation_ms: t.navigation.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub max_attempts: u32,

    /// Signatures added to the built-in allow-list
    pub extra_signatures: Vec<ObstructionSignature>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            extra_signatures: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Allowed absolute difference for price checks
    pub epsilon: Decimal,

    /// Decimal places prices are rounded to before comparison
    pub precision: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            epsilon: Decimal::ZERO,
            precision: DEFAULT_PRECISION,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file; a missing file gives the defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `SHOPCHECK_*` overrides from the process environment
    pub fn apply_env(&mut self) -> E2eResult<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> E2eResult<()> {
        if let Some(url) = var("SHOPCHECK_BASE_URL") {
            self.base_url = url;
        }
        if let Some(email) = var("SHOPCHECK_EMAIL") {
            self.account.email = email;
        }
        if let Some(password) = var("SHOPCHECK_PASSWORD") {
            self.account.password = password;
        }
        if let Some(raw) = var("SHOPCHECK_HEADLESS") {
            self.browser.headless = parse_flag(&raw)
                .ok_or_else(|| E2eError::Config(format!("SHOPCHECK_HEADLESS must be a boolean, got '{}'", raw)))?;
        }
        self.validate()
    }

    pub fn validate(&self) -> E2eResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(E2eError::Config(format!("base_url must be http(s): '{}'", self.base_url)));
        }
        if self.oracle.epsilon.is_sign_negative() {
            return Err(E2eError::Config("oracle.epsilon must not be negative".to_string()));
        }
        if self.timeouts.poll_interval_ms == 0 {
            return Err(E2eError::Config("timeouts.poll_interval_ms must be positive".to_string()));
        }
        Ok(())
    }

    pub fn timeouts(&self) -> Timeouts {
        let t = &self.timeouts;
        Timeouts {
            landmark: Duration::from_millis(t.landmark_ms),
            dismiss: Duration::from_millis(t.dismiss_ms),
            poll_interval: Duration::from_millis(t.poll_interval_ms),
            retry_backoff: Duration::from_millis(t.retry_backoff_ms),
            navigation: Duration::from_millis(t.navigation_ms),
        }
    }

    pub fn oracle(&self) -> CartOracle {
        CartOracle::with_tolerance(self.oracle.epsilon, self.oracle.precision)
    }

    pub fn guard(&self) -> OverlayGuard {
        let mut signatures = default_signatures();
        signatures.extend(self.overlay.extra_signatures.iter().cloned());
        let timeouts = self.timeouts();
        OverlayGuard::new(signatures)
            .with_max_attempts(self.overlay.max_attempts)
            .with_timing(timeouts.dismiss, timeouts.poll_interval)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use test_case::test_case;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, HarnessConfig::default());
        assert_eq!(config.timeouts(), Timeouts::default());
        assert_eq!(config.oracle().epsilon(), Decimal::ZERO);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shopcheck.toml");
        std::fs::write(
            &path,
            r##"
base_url = "http://localhost:8080"

[timeouts]
landmark_ms = 2500

[oracle]
epsilon = "0.01"

[[overlay.extra_signatures]]
name = "newsletter"
root = "#newsletter-popup"
dismiss = ["#newsletter-popup .close"]
detach = ["#newsletter-popup"]
"##,
        )
        .unwrap();

        let config = HarnessConfig::load(&path).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.timeouts().landmark, Duration::from_millis(2500));
        assert_eq!(config.timeouts().dismiss, Duration::from_secs(2));
        assert_eq!(config.oracle.epsilon, Decimal::new(1, 2));
        assert_eq!(config.oracle.precision, 2);
        assert_eq!(config.overlay.max_attempts, 3);
        assert!(config.guard().signatures().iter().any(|s| s.name == "newsletter"));
        assert!(config.guard().signatures().iter().any(|s| s.name == "consent-dialog"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("shopcheck.toml");
        let mut config = HarnessConfig::default();
        config.browser.headless = false;
        config.save(&path).unwrap();
        assert_eq!(HarnessConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SHOPCHECK_BASE_URL", "http://staging.shop"),
            ("SHOPCHECK_EMAIL", "ci@shop.test"),
            ("SHOPCHECK_HEADLESS", "false"),
        ]
        .into_iter()
        .collect();

        let mut config = HarnessConfig::default();
        config.apply_vars(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.base_url, "http://staging.shop");
        assert_eq!(config.account.email, "ci@shop.test");
        assert_eq!(config.account.password, "Valid123!");
        assert!(!config.browser.headless);
    }

    #[test_case("SHOPCHECK_HEADLESS", "sometimes" ; "bad headless flag")]
    #[test_case("SHOPCHECK_BASE_URL", "ftp://shop" ; "non http base url")]
    fn test_env_rejects(key: &str, value: &str) {
        let mut config = HarnessConfig::default();
        let err = config
            .apply_vars(|k| (k == key).then(|| value.to_string()))
            .unwrap_err();
        assert!(matches!(err, E2eError::Config(_)));
    }
}
