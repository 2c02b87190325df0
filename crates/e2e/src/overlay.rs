//! Transient obstruction handling
//!
//! [`OverlayGuard`] clears consent banners, ad frames, and stray modal
//! backdrops before an interaction. It only acts on an explicit allow-list of
//! [`ObstructionSignature`]s; nothing outside the list is ever touched, so
//! genuine page content cannot be hidden by the guard.
//!
//! For each visible obstruction the guard tries, in order:
//! 1. an affirmative dismissal control, waiting a bounded time for the
//!    obstruction to go away;
//! 2. detaching the obstruction's nodes directly;
//! 3. recording a warning and moving on.
//!
//! A full pass is repeated up to `max_attempts` times. If anything from the
//! allow-list is still visible after that, the guard gives up with an
//! [`Error::Obstruction`] the caller may retry.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use shopcheck_common::Error;
use tracing::{debug, warn};

use crate::driver::{PageDriver, WaitState};
use crate::error::E2eResult;
use crate::wait;

/// One known kind of obstruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstructionSignature {
    pub name: String,
    /// Visible while the obstruction is present
    pub root: String,
    /// Affirmative controls ("Accept", "Close"), tried in order
    #[serde(default)]
    pub dismiss: Vec<String>,
    /// Nodes to detach when dismissal is unavailable or fails
    #[serde(default)]
    pub detach: Vec<String>,
}

impl ObstructionSignature {
    pub fn new(name: &str, root: &str) -> Self {
        Self {
            name: name.to_string(),
            root: root.to_string(),
            dismiss: Vec::new(),
            detach: vec![root.to_string()],
        }
    }

    pub fn dismiss_with(mut self, controls: &[&str]) -> Self {
        self.dismiss = controls.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn also_detach(mut self, selectors: &[&str]) -> Self {
        self.detach.extend(selectors.iter().map(|s| s.to_string()));
        self
    }
}

/// The obstructions seen on the storefront
pub fn default_signatures() -> Vec<ObstructionSignature> {
    vec![
        ObstructionSignature::new("consent-dialog", ".fc-consent-root")
            .dismiss_with(&[
                "button.fc-button.fc-cta-consent",
                "button:has-text('Accept All')",
                "button:has-text('AGREE')",
            ])
            .also_detach(&[".fc-dialog-overlay"]),
        ObstructionSignature::new("consent-overlay", ".fc-dialog-overlay").dismiss_with(&[".fc-close"]),
        ObstructionSignature::new("sourcepoint-veil", ".sp_veil")
            .dismiss_with(&[".sp_choice_type_11"])
            .also_detach(&["div[id^='sp_message_container']"]),
        ObstructionSignature::new("ezoic-consent", "#ez-cookie-dialog-wrapper").dismiss_with(&["#ez-accept-all"]),
        ObstructionSignature::new("ad-vignette", "#ad_position_box").dismiss_with(&["#dismiss-button"]),
        ObstructionSignature::new("google-vignette", "ins.adsbygoogle[data-vignette-loaded='true']"),
        ObstructionSignature::new("stray-backdrop", ".modal-backdrop"),
    ]
}

/// What a guard pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardReport {
    pub dismissed: Vec<String>,
    pub detached: Vec<String>,
    pub warnings: Vec<String>,
}

impl GuardReport {
    pub fn is_clean(&self) -> bool {
        self.dismissed.is_empty() && self.detached.is_empty() && self.warnings.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct OverlayGuard {
    signatures: Vec<ObstructionSignature>,
    max_attempts: u32,
    dismiss_timeout: Duration,
    poll_interval: Duration,
}

impl Default for OverlayGuard {
    fn default() -> Self {
        Self::new(default_signatures())
    }
}

impl OverlayGuard {
    pub fn new(signatures: Vec<ObstructionSignature>) -> Self {
        Self {
            signatures,
            max_attempts: 3,
            dismiss_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(100),
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_timing(mut self, dismiss_timeout: Duration, poll_interval: Duration) -> Self {
        self.dismiss_timeout = dismiss_timeout;
        self.poll_interval = poll_interval;
        self
    }

    pub fn signatures(&self) -> &[ObstructionSignature] {
        &self.signatures
    }

    /// Clear every allow-listed obstruction before acting on `target`.
    ///
    /// A no-op when nothing obstructs.
    pub async fn ensure_interactable(&self, driver: &dyn PageDriver, target: &str) -> E2eResult<GuardReport> {
        let mut report = GuardReport::default();

        for attempt in 1..=self.max_attempts {
            let present = self.visible(driver).await?;
            if present.is_empty() {
                return Ok(report);
            }
            debug!(
                "Attempt {}/{} clearing {} obstruction(s) before {}",
                attempt,
                self.max_attempts,
                present.len(),
                target
            );

            for sig in present {
                if self.try_dismiss(driver, sig).await? {
                    debug!("Dismissed {}", sig.name);
                    report.dismissed.push(sig.name.clone());
                } else if self.try_detach(driver, sig).await? {
                    debug!("Detached {}", sig.name);
                    report.detached.push(sig.name.clone());
                } else {
                    warn!("Could not clear {} before {} (attempt {})", sig.name, target, attempt);
                    report
                        .warnings
                        .push(format!("{} survived attempt {} before {}", sig.name, attempt, target));
                }
            }
        }

        match self.visible(driver).await?.first() {
            None => Ok(report),
            Some(sig) => Err(Error::Obstruction {
                signature: sig.name.clone(),
                target: target.to_string(),
                attempts: self.max_attempts,
            }
            .into()),
        }
    }

    async fn visible(&self, driver: &dyn PageDriver) -> E2eResult<Vec<&ObstructionSignature>> {
        let mut present = Vec::new();
        for sig in &self.signatures {
            if driver.is_visible(&sig.root).await? {
                present.push(sig);
            }
        }
        Ok(present)
    }

    async fn try_dismiss(&self, driver: &dyn PageDriver, sig: &ObstructionSignature) -> E2eResult<bool> {
        for control in &sig.dismiss {
            if !driver.is_visible(control).await? {
                continue;
            }
            if let Err(e) = driver.click(control).await {
                debug!("Dismiss control {} for {} failed: {}", control, sig.name, e);
                continue;
            }
            let gone = wait::wait_for(
                driver,
                &sig.root,
                WaitState::Hidden,
                self.dismiss_timeout,
                self.poll_interval,
            )
            .await;
            if gone.is_ok() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn try_detach(&self, driver: &dyn PageDriver, sig: &ObstructionSignature) -> E2eResult<bool> {
        let mut removed = 0;
        for selector in &sig.detach {
            removed += driver.remove(selector).await?;
        }
        if removed == 0 {
            return Ok(false);
        }
        Ok(!driver.is_visible(&sig.root).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list_never_targets_all_iframes() {
        for sig in default_signatures() {
            assert_ne!(sig.root.trim(), "iframe");
            assert!(sig.detach.iter().all(|d| d.trim() != "iframe"));
            assert!(sig.detach.contains(&sig.root));
        }
    }

    #[test]
    fn test_max_attempts_is_at_least_one() {
        let guard = OverlayGuard::default().with_max_attempts(0);
        assert_eq!(guard.max_attempts, 1);
    }
}
