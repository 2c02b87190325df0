//! Obstruction handling against the in-memory storefront

use shopcheck_common::{CartOracle, CheckoutState, Error, ErrorKind};
use shopcheck_e2e::mock::{MockObstruction, MockStore, ObstructionBehavior};
use shopcheck_e2e::pages::{PageObject, ProductsPage};
use shopcheck_e2e::{CheckoutFlow, E2eError, ObstructionSignature, OverlayGuard, PageDriver};

fn obstruction(name: &str, behavior: ObstructionBehavior) -> MockObstruction {
    MockObstruction::named(name, behavior).expect("default signature")
}

#[tokio::test]
async fn test_consent_dialog_is_dismissed() {
    let store = MockStore::new().with_obstruction(obstruction("consent-dialog", ObstructionBehavior::Dismissible));
    let session = store.session("consent");
    session.goto("/products").await.unwrap();

    let report = session
        .guard()
        .ensure_interactable(session.driver(), "add to cart")
        .await
        .unwrap();
    assert_eq!(report.dismissed, vec!["consent-dialog".to_string()]);
    assert!(report.detached.is_empty());
    assert!(!session.driver().is_visible(".fc-consent-root").await.unwrap());
}

#[tokio::test]
async fn test_broken_dismiss_control_falls_back_to_detach() {
    let store = MockStore::new().with_obstruction(obstruction("sourcepoint-veil", ObstructionBehavior::DismissFails));
    let session = store.session("veil");
    session.goto("/").await.unwrap();

    let report = session
        .guard()
        .ensure_interactable(session.driver(), "listing")
        .await
        .unwrap();
    assert!(report.dismissed.is_empty());
    assert_eq!(report.detached, vec!["sourcepoint-veil".to_string()]);
    assert!(report.warnings.is_empty());
}

#[tokio::test]
async fn test_vignette_without_control_is_detached() {
    let store = MockStore::new().with_obstruction(obstruction("google-vignette", ObstructionBehavior::DetachOnly));
    let session = store.session("vignette");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    let cart = flow.add_product(2, 1).await.unwrap();
    assert_eq!(cart.quantity_of(2), 1);
    assert!(session.warnings().is_empty());
}

#[tokio::test]
async fn test_sticky_obstruction_fails_with_its_name() {
    let store = MockStore::new().with_obstruction(obstruction("ad-vignette", ObstructionBehavior::Sticky));
    let session = store
        .session("sticky")
        .with_guard(OverlayGuard::default().with_max_attempts(2));
    let page = ProductsPage::open(&session).await.unwrap();

    let err = page.add_to_cart(1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Obstruction);
    match err {
        E2eError::Check(Error::Obstruction {
            signature, attempts, ..
        }) => {
            assert_eq!(signature, "ad-vignette");
            assert_eq!(attempts, 2);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_obstruction_on_first_pages_only() {
    // Shown on the first cart read and the first listing, then gone
    let store = MockStore::new()
        .with_obstruction(obstruction("ezoic-consent", ObstructionBehavior::Dismissible).times(2));
    let session = store.session("once");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    flow.add_product(1, 1).await.unwrap();
    let cart = flow.add_product(1, 1).await.unwrap();
    assert_eq!(cart.quantity_of(1), 2);
}

#[tokio::test]
async fn test_unlisted_overlay_is_left_alone() {
    let newsletter = ObstructionSignature::new("newsletter", "#newsletter-popup").dismiss_with(&["#newsletter-popup .close"]);
    let store = MockStore::new().with_obstruction(MockObstruction::new(newsletter, ObstructionBehavior::Dismissible));
    let session = store.session("unlisted");
    session.goto("/products").await.unwrap();

    // Not on the allow-list, so the guard reports nothing to do
    let report = session
        .guard()
        .ensure_interactable(session.driver(), "listing")
        .await
        .unwrap();
    assert!(report.is_clean());
    assert!(session.driver().is_visible("#newsletter-popup").await.unwrap());
}

#[tokio::test]
async fn test_extra_signature_extends_the_allow_list() {
    let newsletter = ObstructionSignature::new("newsletter", "#newsletter-popup").dismiss_with(&["#newsletter-popup .close"]);
    let store = MockStore::new().with_obstruction(MockObstruction::new(newsletter.clone(), ObstructionBehavior::Dismissible));

    let mut signatures = shopcheck_e2e::overlay::default_signatures();
    signatures.push(newsletter);
    let session = store.session("extended").with_guard(OverlayGuard::new(signatures));
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    let cart = flow.add_product(4, 1).await.unwrap();
    assert_eq!(cart.quantity_of(4), 1);
}

#[tokio::test]
async fn test_confirm_can_be_retried_after_an_obstruction() {
    let store = MockStore::new();
    let session = store
        .session("confirm-retry")
        .with_guard(OverlayGuard::default().with_max_attempts(1));
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());
    flow.login("valid@user.com", "Valid123!").await.unwrap();
    flow.add_product(1, 1).await.unwrap();
    assert_eq!(flow.proceed().await.unwrap(), CheckoutState::OrderReview);

    // The reloaded checkout page is covered once
    store.add_obstruction(obstruction("ad-vignette", ObstructionBehavior::Sticky).times(1));
    session.goto("/checkout").await.unwrap();
    let err = flow.confirm(Some("hello")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Obstruction);
    assert_eq!(flow.state(), CheckoutState::OrderReview);

    session.goto("/checkout").await.unwrap();
    assert_eq!(flow.confirm(Some("hello")).await.unwrap(), CheckoutState::PaymentEntry);
    let entered = flow
        .history()
        .iter()
        .filter(|s| **s == CheckoutState::PaymentEntry)
        .count();
    assert_eq!(entered, 1);
}

#[tokio::test]
async fn test_proceed_can_be_retried_after_an_obstruction() {
    let store = MockStore::new();
    let session = store
        .session("proceed-retry")
        .with_guard(OverlayGuard::default().with_max_attempts(1));
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());
    flow.login("valid@user.com", "Valid123!").await.unwrap();
    flow.add_product(2, 1).await.unwrap();

    store.add_obstruction(obstruction("ad-vignette", ObstructionBehavior::Sticky).times(1));
    let err = flow.proceed().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(flow.state(), CheckoutState::CartReview);

    assert_eq!(flow.proceed().await.unwrap(), CheckoutState::OrderReview);
}
