//! Scenario runner: sessions in, suite report out

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shopcheck_common::{normalize_amount, CartOracle, CheckoutState, Failure};
use tracing::{debug, error, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::flow::CheckoutFlow;
use crate::pages::{
    login, AccountDetails, ContactMessage, ContactPage, LoginOutcome, PageObject, PaymentDetails, PaymentOutcome,
    ProductDetailsPage, ProductsPage, RegistrationPage,
};
use crate::scenario::{AccountMode, Action, LoginExpectation, PaymentExpectation, Scenario};
use crate::session::Session;

/// Source of fresh browser sessions, one per scenario
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create(&self, label: &str) -> E2eResult<Session>;
}

/// Result of executing one scenario step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub index: usize,
    pub action: String,
    pub success: bool,
    pub duration_ms: u64,
    /// What the step saw, e.g. an unasserted login outcome
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub final_state: CheckoutState,
    pub steps: Vec<StepResult>,
    /// Non-fatal obstruction warnings
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

/// Result of running a set of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    /// RFC 3339 start time of the run
    pub started_at: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Fixture credentials for `account: fixture` scenarios
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            email: "valid@user.com".to_string(),
            password: "Valid123!".to_string(),
        }
    }
}

/// Configuration for the scenario runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub scenarios_dir: PathBuf,
    pub output_dir: PathBuf,
    pub account: Credentials,
    pub oracle: CartOracle,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            scenarios_dir: PathBuf::from("crates/e2e/scenarios"),
            output_dir: PathBuf::from("test-results"),
            account: Credentials::default(),
            oracle: CartOracle::new(),
        }
    }
}

/// Runs scenarios one after another, each in its own session.
///
/// Scenarios never run concurrently: a shared fixture account would let
/// one scenario's cart writes leak into another's.
pub struct ScenarioRunner {
    factory: Arc<dyn SessionFactory>,
    config: RunnerConfig,
}

impl ScenarioRunner {
    pub fn new(factory: Arc<dyn SessionFactory>, config: RunnerConfig) -> Self {
        Self { factory, config }
    }

    /// Run all scenarios in the scenarios directory
    pub async fn run_all(&self) -> E2eResult<SuiteResult> {
        let scenarios = Scenario::load_all(&self.config.scenarios_dir)?;
        self.run_scenarios(&scenarios).await
    }

    /// Run scenarios carrying `tag`
    pub async fn run_tagged(&self, tag: &str) -> E2eResult<SuiteResult> {
        let scenarios = Scenario::load_all(&self.config.scenarios_dir)?;
        let filtered: Vec<Scenario> = Scenario::filter_by_tag(&scenarios, tag).into_iter().cloned().collect();
        self.run_scenarios(&filtered).await
    }

    /// Run one scenario by name
    pub async fn run_named(&self, name: &str) -> E2eResult<ScenarioResult> {
        let scenarios = Scenario::load_all(&self.config.scenarios_dir)?;
        let scenario = scenarios
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::ScenarioParse(format!("Scenario not found: {}", name)))?;
        self.run_scenario(&scenario).await
    }

    pub async fn run_scenarios(&self, scenarios: &[Scenario]) -> E2eResult<SuiteResult> {
        let start = Instant::now();
        let started_at = chrono::Utc::now().to_rfc3339();
        let mut results = Vec::with_capacity(scenarios.len());
        let mut passed = 0;
        let mut failed = 0;
        let mut skipped = 0;

        info!("Running {} scenario(s)...", scenarios.len());

        for scenario in scenarios {
            if scenario.steps.is_empty() {
                skipped += 1;
                warn!("- {} has no steps, skipped", scenario.name);
                continue;
            }
            match self.run_scenario(scenario).await {
                Ok(result) => {
                    if result.success {
                        passed += 1;
                        info!("✓ {} ({} ms)", result.name, result.duration_ms);
                    } else {
                        failed += 1;
                        error!(
                            "✗ {} - {}",
                            result.name,
                            result.failure.as_ref().map(|f| f.message.as_str()).unwrap_or("unknown error")
                        );
                    }
                    results.push(result);
                }
                Err(e) => {
                    failed += 1;
                    error!("✗ {} - {}", scenario.name, e);
                    results.push(ScenarioResult {
                        name: scenario.name.clone(),
                        success: false,
                        duration_ms: 0,
                        final_state: CheckoutState::Anonymous,
                        steps: vec![],
                        warnings: vec![],
                        failure: Some(e.to_failure()),
                    });
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Scenario results: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, skipped, duration_ms
        );

        Ok(SuiteResult {
            started_at,
            total: scenarios.len(),
            passed,
            failed,
            skipped,
            duration_ms,
            results,
        })
    }

    /// Run a single scenario in a fresh session. Stops at the first failing step.
    pub async fn run_scenario(&self, scenario: &Scenario) -> E2eResult<ScenarioResult> {
        let start = Instant::now();
        debug!("Running scenario: {}", scenario.name);

        let session = self.factory.create(&scenario.name).await?;
        let account = match scenario.account {
            AccountMode::Fixture => AccountDetails::new("QA Tester", &self.config.account.email, &self.config.account.password),
            AccountMode::Unique => AccountDetails::unique(&slug(&scenario.name)),
        };
        let mut run = ScenarioRun {
            flow: CheckoutFlow::new(&session, self.config.oracle.clone()),
            account,
            registered: false,
        };

        let mut steps = Vec::with_capacity(scenario.steps.len());
        let mut failure = None;
        for (index, step) in scenario.steps.iter().enumerate() {
            let step_start = Instant::now();
            let outcome = run.execute(&step.action).await;
            let (observation, step_failure) = match (outcome, step.expect_error) {
                (Ok(observation), None) => (observation, None),
                (Ok(_), Some(kind)) => (
                    None,
                    Some(Failure {
                        kind: shopcheck_common::ErrorKind::Harness,
                        message: format!("expected a {} error, step succeeded", kind),
                        expected: Some(kind.to_string()),
                        observed: Some("success".to_string()),
                    }),
                ),
                (Err(e), Some(kind)) if e.kind() == kind => (Some(format!("raised {} as expected", kind)), None),
                (Err(e), _) => (None, Some(e.to_failure())),
            };

            let success = step_failure.is_none();
            steps.push(StepResult {
                index,
                action: step.action.label(),
                success,
                duration_ms: step_start.elapsed().as_millis() as u64,
                observation,
                failure: step_failure.clone(),
            });
            if !success {
                failure = step_failure;
                break;
            }
        }

        run.cleanup().await;
        let final_state = run.flow.state();
        drop(run);

        if let Err(e) = session.driver().close().await {
            warn!("Closing session for {} failed: {}", scenario.name, e);
        }

        Ok(ScenarioResult {
            name: scenario.name.clone(),
            success: failure.is_none(),
            duration_ms: start.elapsed().as_millis() as u64,
            final_state,
            steps,
            warnings: session.take_warnings(),
            failure,
        })
    }

    /// Write suite results to `results.json` in the output directory
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

fn slug(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    slug.trim_matches('-').chars().take(24).collect()
}

/// Per-scenario state while steps execute
struct ScenarioRun<'s> {
    flow: CheckoutFlow<'s>,
    account: AccountDetails,
    registered: bool,
}

impl<'s> ScenarioRun<'s> {
    async fn execute(&mut self, action: &Action) -> E2eResult<Option<String>> {
        let session = self.flow.session();
        match action {
            Action::OpenCart => {
                let cart = self.flow.open_cart().await?;
                Ok(Some(format!("{} line(s), total {}", cart.len(), cart.total())))
            }
            Action::AddProduct { product_id, quantity } => {
                let cart = self.flow.add_product(*product_id, *quantity).await?;
                Ok(Some(format!("quantity now {}", cart.quantity_of(*product_id))))
            }
            Action::RemoveProduct { product_id } => {
                let cart = self.flow.remove_product(*product_id).await?;
                Ok(Some(format!("{} line(s) left", cart.len())))
            }
            Action::Search {
                term,
                expect_products,
                expect_empty,
            } => {
                let results = ProductsPage::open(session).await?.search(term).await?;
                for id in expect_products {
                    if !results.contains(*id) {
                        return Err(expectation(
                            format!("search '{}'", term),
                            format!("product {} listed", id),
                            format!("{:?}", results.products.iter().map(|p| p.id).collect::<Vec<_>>()),
                        ));
                    }
                }
                if let Some(empty) = expect_empty {
                    if results.is_empty() != *empty {
                        return Err(expectation(
                            format!("search '{}'", term),
                            format!("empty = {}", empty),
                            format!("{} result(s)", results.products.len()),
                        ));
                    }
                }
                Ok(Some(format!("{} result(s)", results.products.len())))
            }
            Action::Login {
                email,
                password,
                expect,
            } => {
                let email = email.clone().unwrap_or_else(|| self.account.email.clone());
                let password = password.clone().unwrap_or_else(|| self.account.password.clone());
                let outcome = self.flow.login(&email, &password).await?;
                if let Some(want) = expect {
                    let matches = matches!(
                        (want, &outcome),
                        (LoginExpectation::Authenticated, LoginOutcome::Authenticated { .. })
                            | (LoginExpectation::Rejected, LoginOutcome::Rejected { .. })
                            | (LoginExpectation::Stayed, LoginOutcome::Stayed { .. })
                    );
                    if !matches {
                        return Err(expectation("login", format!("{:?}", want), format!("{:?}", outcome)));
                    }
                }
                Ok(Some(format!("{:?}", outcome)))
            }
            Action::Register => {
                let outcome = self.flow.register(&self.account).await?;
                if let crate::pages::RegistrationOutcome::Created { .. } = outcome {
                    self.registered = true;
                }
                Ok(Some(format!("{:?}", outcome)))
            }
            Action::DeleteAccount => {
                let deleted = RegistrationPage::delete_account(session).await?;
                if deleted {
                    self.registered = false;
                }
                Ok(Some(format!("deleted = {}", deleted)))
            }
            Action::Logout => {
                self.flow.logout().await?;
                Ok(None)
            }
            Action::Proceed => {
                let state = self.flow.proceed().await?;
                Ok(Some(state.to_string()))
            }
            Action::Confirm { comment } => {
                self.flow.confirm(comment.as_deref()).await?;
                Ok(None)
            }
            Action::Pay { card_number, expect } => {
                let details = match card_number {
                    Some(card) => PaymentDetails::with_card(card.clone()),
                    None => PaymentDetails::default(),
                };
                let outcome = self.flow.pay(&details).await?;
                let got = match outcome {
                    PaymentOutcome::Placed => PaymentExpectation::Placed,
                    PaymentOutcome::Declined { .. } => PaymentExpectation::Declined,
                };
                if let Some(want) = expect {
                    if *want != got {
                        return Err(expectation("payment", format!("{:?}", want), format!("{:?}", outcome)));
                    }
                }
                Ok(Some(format!("{:?}", outcome)))
            }
            Action::RetryPayment => {
                self.flow.retry_payment().await?;
                Ok(None)
            }
            Action::Review { product_id, text } => {
                let page = ProductDetailsPage::open_product(session, *product_id).await?;
                page.write_review(&self.account.name, &self.account.email, text).await?;
                Ok(None)
            }
            Action::Contact { subject, message } => {
                let page = ContactPage::open(session).await?;
                let sent = ContactMessage::new(&self.account.name, &self.account.email, subject, message);
                let status = page.submit(&sent).await?;
                Ok(Some(status))
            }
            Action::ExpectState { state } => {
                if self.flow.state() != *state {
                    return Err(expectation("checkout state", state.to_string(), self.flow.state().to_string()));
                }
                Ok(None)
            }
            Action::ExpectCart { lines, total } => {
                let cart = self.flow.observe_cart().await?;
                if cart.len() != lines.len() {
                    return Err(expectation("cart rows", lines.len().to_string(), cart.len().to_string()));
                }
                for want in lines {
                    let got = cart.line(want.product_id).ok_or_else(|| {
                        expectation(format!("cart line {}", want.product_id), "present", "absent")
                    })?;
                    if got.quantity != want.quantity {
                        return Err(expectation(
                            format!("quantity of {}", want.product_id),
                            want.quantity.to_string(),
                            got.quantity.to_string(),
                        ));
                    }
                    if let Some(raw) = &want.line_total {
                        let expected = normalize_amount(raw)?;
                        if got.line_total != expected {
                            return Err(expectation(
                                format!("line total of {}", want.product_id),
                                expected.to_string(),
                                got.line_total.to_string(),
                            ));
                        }
                    }
                }
                if let Some(raw) = total {
                    let expected = normalize_amount(raw)?;
                    if cart.total() != expected {
                        return Err(expectation("cart total", expected.to_string(), cart.total().to_string()));
                    }
                }
                Ok(Some(format!("{} line(s), total {}", cart.len(), cart.total())))
            }
            Action::ExpectLoggedIn { value } => {
                let shown = login::is_logged_in(session).await?;
                if session.is_authenticated() != *value || shown != *value {
                    return Err(expectation(
                        "logged in",
                        value.to_string(),
                        format!("flag {}, landmark {}", session.is_authenticated(), shown),
                    ));
                }
                Ok(None)
            }
            Action::Log { message } => {
                info!("[SCENARIO LOG] {}", message);
                Ok(None)
            }
        }
    }

    /// Remove an account this scenario registered. Failures are only logged.
    async fn cleanup(&mut self) {
        if !self.registered {
            return;
        }
        let session = self.flow.session();
        if !session.is_authenticated() {
            if let Err(e) = self.flow.login(&self.account.email, &self.account.password).await {
                warn!("Cleanup login for {} failed: {}", self.account.email, e);
                return;
            }
        }
        match RegistrationPage::delete_account(session).await {
            Ok(true) => debug!("Deleted scenario account {}", self.account.email),
            Ok(false) => warn!("Scenario account {} was not logged in, not deleted", self.account.email),
            Err(e) => warn!("Deleting scenario account {} failed: {}", self.account.email, e),
        }
    }
}

fn expectation(context: impl Into<String>, expected: impl Into<String>, observed: impl Into<String>) -> E2eError {
    E2eError::Expectation {
        context: context.into(),
        expected: expected.into(),
        observed: observed.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug() {
        assert_eq!(slug("Guest cart survives login!"), "guest-cart-survives-logi");
        assert_eq!(slug("ok"), "ok");
    }
}
