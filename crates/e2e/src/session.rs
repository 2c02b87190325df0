//! One browser page and its authentication flag

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::driver::PageDriver;
use crate::error::E2eResult;
use crate::overlay::OverlayGuard;

/// Bounds on every wait a session performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    /// Waiting for a page's ready landmark
    pub landmark: Duration,
    /// Waiting for an obstruction to go away after its dismiss control
    pub dismiss: Duration,
    pub poll_interval: Duration,
    /// Pause before the single retry of a timed-out wait
    pub retry_backoff: Duration,
    pub navigation: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            landmark: Duration::from_secs(10),
            dismiss: Duration::from_secs(2),
            poll_interval: Duration::from_millis(100),
            retry_backoff: Duration::from_millis(500),
            navigation: Duration::from_secs(30),
        }
    }
}

/// Explicit replacement for a global browser handle: every page object
/// borrows the session it acts on.
///
/// `authenticated` changes only on an explicit login, registration, or
/// logout. It is not re-derived from the page on navigation.
pub struct Session {
    driver: Arc<dyn PageDriver>,
    base_url: String,
    label: String,
    authenticated: AtomicBool,
    timeouts: Timeouts,
    guard: OverlayGuard,
    warnings: Mutex<Vec<String>>,
}

impl Session {
    pub fn new(driver: Arc<dyn PageDriver>, base_url: impl Into<String>) -> Self {
        let timeouts = Timeouts::default();
        Self {
            driver,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            label: "session".to_string(),
            authenticated: AtomicBool::new(false),
            guard: OverlayGuard::default().with_timing(timeouts.dismiss, timeouts.poll_interval),
            timeouts,
            warnings: Mutex::new(Vec::new()),
        }
    }

    /// Replace the timeouts; the guard's dismiss timing follows them
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.guard = self.guard.with_timing(timeouts.dismiss, timeouts.poll_interval);
        self.timeouts = timeouts;
        self
    }

    pub fn with_guard(mut self, guard: OverlayGuard) -> Self {
        self.guard = guard.with_timing(self.timeouts.dismiss, self.timeouts.poll_interval);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn driver(&self) -> &dyn PageDriver {
        self.driver.as_ref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    pub fn guard(&self) -> &OverlayGuard {
        &self.guard
    }

    pub fn url(&self, route: &str) -> String {
        if route.starts_with("http://") || route.starts_with("https://") {
            return route.to_string();
        }
        format!("{}/{}", self.base_url, route.trim_start_matches('/'))
    }

    pub async fn goto(&self, route: &str) -> E2eResult<()> {
        let url = self.url(route);
        debug!("[{}] goto {}", self.label, url);
        self.driver.goto(&url).await
    }

    /// Current location relative to the base URL, e.g. `/login`
    pub async fn current_route(&self) -> E2eResult<String> {
        let url = self.driver.current_url().await?;
        let route = url.strip_prefix(&self.base_url).unwrap_or(&url);
        Ok(if route.is_empty() { "/".to_string() } else { route.to_string() })
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    pub(crate) fn set_authenticated(&self, value: bool) {
        if self.authenticated.swap(value, Ordering::SeqCst) != value {
            info!("[{}] authenticated = {}", self.label, value);
        }
    }

    /// Record a non-fatal warning for the scenario report
    pub fn warn(&self, message: impl Into<String>) {
        self.warnings.lock().push(message.into());
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().clone()
    }

    pub fn take_warnings(&self) -> Vec<String> {
        std::mem::take(&mut *self.warnings.lock())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("label", &self.label)
            .field("base_url", &self.base_url)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
