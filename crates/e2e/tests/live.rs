use std::time::Duration;

use shopcheck_common::CartOracle;
use shopcheck_e2e::pages::{LoginPage, PageObject, ProductsPage};
use shopcheck_e2e::playwright::{check_playwright_installed, PlaywrightSessions};
use shopcheck_e2e::runner::SessionFactory;
use shopcheck_e2e::{site, CheckoutFlow, HarnessConfig};

fn live_config() -> Option<HarnessConfig> {
    if check_playwright_installed().is_err() {
        eprintln!("Skipping: playwright not available via npx");
        return None;
    }
    let mut config = HarnessConfig::default();
    if let Err(e) = config.apply_env() {
        eprintln!("Skipping: {}", e);
        return None;
    }
    Some(config)
}

fn sessions(config: &HarnessConfig) -> PlaywrightSessions {
    PlaywrightSessions::new(config.browser.clone(), config.base_url.clone(), config.timeouts(), config.guard())
}

/// Live storefront smoke test.
///
/// Marked ignored because it needs Node, a Playwright browser, and network
/// access to the storefront.
#[tokio::test]
#[ignore]
async fn live_listing_and_cart_agree() {
    let Some(config) = live_config() else {
        return;
    };
    if let Err(e) = site::wait_for_reachable(&config.base_url, Duration::from_secs(20), Duration::from_secs(1)).await {
        eprintln!("Skipping: {}", e);
        return;
    }

    let session = sessions(&config).create("live-cart").await.unwrap();
    let listed = ProductsPage::open(&session).await.unwrap().products().await.unwrap();
    assert!(!listed.is_empty());

    let mut flow = CheckoutFlow::new(&session, config.oracle());
    let cart = flow.add_product(listed[0].id, 1).await.unwrap();
    assert_eq!(cart.quantity_of(listed[0].id), 1);
    let cart = flow.remove_product(listed[0].id).await.unwrap();
    assert!(cart.is_empty());

    session.driver().close().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn live_wrong_password_is_not_authenticated() {
    let Some(config) = live_config() else {
        return;
    };
    let session = sessions(&config).create("live-login").await.unwrap();

    let outcome = LoginPage::open(&session)
        .await
        .unwrap()
        .login(&config.account.email, "definitely-not-the-password")
        .await
        .unwrap();
    assert!(!outcome.is_authenticated());
    assert!(!session.is_authenticated());

    // The flow refuses to skip the gate regardless of what the site does
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());
    assert!(flow.confirm(None).await.is_err());

    session.driver().close().await.unwrap();
}
