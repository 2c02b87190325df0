//! Bundled YAML scenarios through the runner, against the in-memory storefront

use std::path::PathBuf;
use std::sync::Arc;

use shopcheck_common::{CheckoutState, ErrorKind};
use shopcheck_e2e::mock::Faults;
use shopcheck_e2e::runner::SuiteResult;
use shopcheck_e2e::{MockStore, RunnerConfig, Scenario, ScenarioRunner};
use tempfile::TempDir;

fn bundled() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/scenarios"))
}

fn runner(store: MockStore, output: &TempDir) -> ScenarioRunner {
    ScenarioRunner::new(
        Arc::new(store),
        RunnerConfig {
            scenarios_dir: bundled(),
            output_dir: output.path().to_path_buf(),
            ..RunnerConfig::default()
        },
    )
}

fn failures(suite: &SuiteResult) -> Vec<String> {
    suite
        .results
        .iter()
        .filter(|r| !r.success)
        .map(|r| format!("{}: {:?}", r.name, r.failure))
        .collect()
}

#[tokio::test]
async fn test_bundled_scenarios_pass_on_one_store() {
    let output = TempDir::new().unwrap();
    let store = MockStore::new();
    let suite = runner(store.clone(), &output).run_all().await.unwrap();

    assert_eq!(suite.total, 8);
    assert!(suite.success(), "failed: {:?}", failures(&suite));
    assert_eq!(suite.passed, 8);
    // Fixture cart is left empty for the next run
    assert!(store.account_cart("valid@user.com").is_empty());
    assert_eq!(store.orders_placed(), 2);
    assert_eq!(store.account_count(), 1);
}

#[tokio::test]
async fn test_results_file_lists_every_step() {
    let output = TempDir::new().unwrap();
    let runner = runner(MockStore::new(), &output);
    let suite = runner.run_tagged("cart").await.unwrap();

    let path = runner.write_results(&suite).unwrap();
    assert_eq!(path, output.path().join("results.json"));

    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["total"], 2);
    assert_eq!(written["failed"], 0);
    let first = &written["results"][0];
    assert_eq!(first["name"], "guest-cart-arithmetic");
    assert_eq!(first["steps"][0]["action"], "add_product:1x1");
}

#[tokio::test]
async fn test_run_named_reports_final_state() {
    let output = TempDir::new().unwrap();
    let result = runner(MockStore::new(), &output)
        .run_named("guest-checkout-through-login")
        .await
        .unwrap();

    assert!(result.success, "{:?}", result.failure);
    assert_eq!(result.final_state, CheckoutState::Anonymous);
    let raised: Vec<_> = result.steps.iter().filter_map(|s| s.observation.as_deref()).collect();
    assert!(raised.contains(&"raised invalid_transition as expected"));
}

#[tokio::test]
async fn test_contact_scenario_reports_status() {
    let output = TempDir::new().unwrap();
    let result = runner(MockStore::new(), &output).run_named("contact-form").await.unwrap();

    assert!(result.success, "{:?}", result.failure);
    assert_eq!(result.steps[0].action, "contact:Order question");
    assert!(result.steps[0].observation.as_deref().unwrap_or_default().starts_with("Success!"));
}

#[tokio::test]
async fn test_unknown_scenario_name() {
    let output = TempDir::new().unwrap();
    let err = runner(MockStore::new(), &output).run_named("no-such-scenario").await.unwrap_err();
    assert!(err.to_string().contains("no-such-scenario"));
}

#[tokio::test]
async fn test_expected_error_that_never_happens_fails_the_step() {
    let scenario = Scenario::from_yaml(
        r#"
name: wrongly-expects-empty
steps:
  - action: add_product
    product_id: 2
  - action: proceed
    expect_error: empty_cart
  - action: log
    message: never reached
"#,
    )
    .unwrap();

    let output = TempDir::new().unwrap();
    let result = runner(MockStore::new(), &output).run_scenario(&scenario).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.steps.len(), 2);
    let failure = result.failure.unwrap();
    assert_eq!(failure.kind, ErrorKind::Harness);
    assert_eq!(failure.expected.as_deref(), Some("empty_cart"));
}

#[tokio::test]
async fn test_wrong_error_kind_is_reported_as_itself() {
    let scenario = Scenario::from_yaml(
        r#"
name: expects-the-wrong-kind
steps:
  - action: confirm
    expect_error: empty_cart
"#,
    )
    .unwrap();

    let output = TempDir::new().unwrap();
    let result = runner(MockStore::new(), &output).run_scenario(&scenario).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.failure.unwrap().kind, ErrorKind::InvalidTransition);
}

#[tokio::test]
async fn test_price_fault_fails_the_cart_scenario() {
    let faults = Faults {
        line_total_skew: rust_decimal::Decimal::new(1, 2),
        ..Faults::default()
    };
    let output = TempDir::new().unwrap();
    let result = runner(MockStore::new().with_faults(faults), &output)
        .run_named("guest-cart-arithmetic")
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.failure.unwrap().kind, ErrorKind::PriceInconsistency);
}

#[tokio::test]
async fn test_scenario_without_steps_is_skipped() {
    let empty = Scenario::from_yaml("name: nothing-to-do\nsteps: []\n").unwrap();
    let output = TempDir::new().unwrap();
    let suite = runner(MockStore::new(), &output).run_scenarios(&[empty]).await.unwrap();

    assert_eq!(suite.total, 1);
    assert_eq!(suite.skipped, 1);
    assert!(suite.results.is_empty());
    assert!(suite.success());
}

#[tokio::test]
async fn test_unique_account_is_cleaned_up() {
    let store = MockStore::new();
    let scenario = Scenario::from_yaml(
        r#"
name: leaves-no-account
account: unique
steps:
  - action: register
  - action: expect_logged_in
    value: true
"#,
    )
    .unwrap();

    let output = TempDir::new().unwrap();
    let result = runner(store.clone(), &output).run_scenario(&scenario).await.unwrap();

    assert!(result.success, "{:?}", result.failure);
    // Only the fixture account is left
    assert_eq!(store.account_count(), 1);
    assert!(store.has_account("valid@user.com"));
}
