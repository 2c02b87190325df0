//! Checkout flow against the in-memory storefront

use rust_decimal::Decimal;
use shopcheck_common::{CartOracle, CheckoutState, Error, ErrorKind, Scope};
use shopcheck_e2e::mock::{Faults, MockStore};
use shopcheck_e2e::pages::{CartPage, CheckoutPage, PageObject, PaymentDetails, PaymentOutcome};
use shopcheck_e2e::{CheckoutFlow, E2eError};

const EMAIL: &str = "valid@user.com";
const PASSWORD: &str = "Valid123!";

fn rs(amount: i64) -> Decimal {
    Decimal::from(amount)
}

#[tokio::test]
async fn test_repeated_add_merges_into_one_line() {
    let store = MockStore::new();
    let session = store.session("merge");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    flow.add_product(1, 1).await.unwrap();
    let cart = flow.add_product(1, 1).await.unwrap();

    assert_eq!(cart.len(), 1);
    assert_eq!(cart.quantity_of(1), 2);
    assert_eq!(cart.line(1).unwrap().line_total, rs(1000));
    assert_eq!(cart.total(), rs(1000));
    assert_eq!(flow.state(), CheckoutState::CartReview);
}

#[tokio::test]
async fn test_total_is_sum_of_line_totals() {
    let store = MockStore::new();
    let session = store.session("sum");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    flow.add_product(1, 1).await.unwrap();
    flow.add_product(3, 2).await.unwrap();
    let cart = flow.add_product(5, 1).await.unwrap();

    let sum: Decimal = cart.lines().iter().map(|l| l.line_total).sum();
    assert_eq!(cart.len(), 3);
    assert_eq!(sum, cart.total());
    assert_eq!(cart.total(), rs(500 + 2000 + 600));
    assert_eq!(flow.oracle().expected().total(), cart.total());
}

#[tokio::test]
async fn test_removing_only_line_shows_empty_cart() {
    let store = MockStore::new();
    let session = store.session("remove");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    flow.add_product(2, 1).await.unwrap();
    let cart = flow.remove_product(2).await.unwrap();

    assert!(cart.is_empty());
    assert_eq!(cart.total(), Decimal::ZERO);
    assert!(flow.oracle().expected().is_empty());
}

#[tokio::test]
async fn test_removing_absent_product_changes_nothing() {
    let store = MockStore::new();
    let session = store.session("remove-absent");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    flow.add_product(2, 1).await.unwrap();
    let cart = flow.remove_product(6).await.unwrap();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart.quantity_of(2), 1);
}

#[tokio::test]
async fn test_zero_quantity_is_rejected_before_touching_the_page() {
    let store = MockStore::new();
    let session = store.session("zero");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    let err = flow.add_product(1, 0).await.unwrap_err();
    assert!(matches!(err, E2eError::Expectation { .. }));
    assert_eq!(flow.state(), CheckoutState::Anonymous);
}

#[tokio::test]
async fn test_empty_cart_cannot_proceed() {
    let store = MockStore::new();
    let session = store.session("empty");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    flow.open_cart().await.unwrap();
    let err = flow.proceed().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyCart);
    assert_eq!(flow.state(), CheckoutState::CartReview);
}

#[tokio::test]
async fn test_cart_with_lines_is_not_empty() {
    let store = MockStore::new();
    let session = store.session("not-empty");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    flow.add_product(2, 1).await.unwrap();
    let page = CartPage::open(&session).await.unwrap();
    assert!(!page.is_empty().await.unwrap());
    assert_eq!(page.rows().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_auth_gate_cannot_be_skipped() {
    let store = MockStore::new();
    let session = store.session("gate");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    flow.add_product(1, 1).await.unwrap();
    assert_eq!(flow.proceed().await.unwrap(), CheckoutState::AuthGate);

    let err = flow.confirm(None).await.unwrap_err();
    match err {
        E2eError::Check(Error::InvalidTransition { from, .. }) => assert_eq!(from, CheckoutState::AuthGate),
        other => panic!("unexpected error: {}", other),
    }
    let err = flow.pay(&PaymentDetails::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    assert_eq!(flow.state(), CheckoutState::AuthGate);
    assert_eq!(store.orders_placed(), 0);
}

#[tokio::test]
async fn test_guest_cart_survives_login() {
    let store = MockStore::new();
    let session = store.session("guest-login");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    flow.add_product(1, 1).await.unwrap();
    flow.add_product(2, 2).await.unwrap();
    flow.proceed().await.unwrap();

    let outcome = flow.login(EMAIL, PASSWORD).await.unwrap();
    assert!(outcome.is_authenticated());
    assert_eq!(flow.state(), CheckoutState::OrderReview);
    assert_eq!(store.account_cart(EMAIL), vec![(1, 1), (2, 2)]);

    let cart = flow.observe_cart().await.unwrap();
    assert_eq!(cart.quantity_of(1), 1);
    assert_eq!(cart.quantity_of(2), 2);
    assert_eq!(cart.total(), rs(500 + 800));
}

#[tokio::test]
async fn test_login_from_cart_keeps_guest_lines() {
    let store = MockStore::new();
    let session = store.session("cart-login");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    flow.add_product(1, 1).await.unwrap();
    assert!(flow.login(EMAIL, PASSWORD).await.unwrap().is_authenticated());
    assert_eq!(flow.state(), CheckoutState::CartReview);
    assert_eq!(flow.oracle().expected().quantity_of(1), 1);
    assert_eq!(store.account_cart(EMAIL), vec![(1, 1)]);
}

#[tokio::test]
async fn test_dropped_guest_cart_fails_login_outside_the_gate() {
    let store = MockStore::new().with_faults(Faults {
        drop_guest_cart: true,
        ..Faults::default()
    });
    let session = store.session("dropped");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    flow.add_product(1, 1).await.unwrap();
    let err = flow.login(EMAIL, PASSWORD).await.unwrap_err();
    match err {
        E2eError::Check(Error::PriceInconsistency {
            scope,
            expected,
            observed,
        }) => {
            assert_eq!(scope, Scope::Quantity { product_id: 1 });
            assert_eq!(expected, Decimal::from(1));
            assert_eq!(observed, Decimal::ZERO);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(flow.state(), CheckoutState::CartReview);
}

#[tokio::test]
async fn test_dropped_guest_cart_fails_at_the_gate() {
    let store = MockStore::new().with_faults(Faults {
        drop_guest_cart: true,
        ..Faults::default()
    });
    let session = store.session("dropped-gate");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    flow.add_product(3, 1).await.unwrap();
    flow.proceed().await.unwrap();
    let err = flow.login(EMAIL, PASSWORD).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PriceInconsistency);
    assert_ne!(flow.state(), CheckoutState::OrderReview);
}

#[tokio::test]
async fn test_login_merges_into_existing_account_cart() {
    let store = MockStore::new();

    // Another context leaves product 1 in the account cart first
    let other = store.session("other");
    let mut first = CheckoutFlow::new(&other, CartOracle::new());
    first.login(EMAIL, PASSWORD).await.unwrap();
    first.add_product(1, 1).await.unwrap();

    let session = store.session("guest");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());
    flow.add_product(1, 1).await.unwrap();
    flow.proceed().await.unwrap();
    flow.login(EMAIL, PASSWORD).await.unwrap();

    assert_eq!(flow.state(), CheckoutState::OrderReview);
    assert_eq!(flow.oracle().expected().quantity_of(1), 2);
}

#[tokio::test]
async fn test_signed_in_proceed_reaches_order_review() {
    let store = MockStore::new();
    let session = store.session("signed-in");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    flow.login(EMAIL, PASSWORD).await.unwrap();
    assert_eq!(flow.state(), CheckoutState::Anonymous);
    flow.add_product(4, 1).await.unwrap();

    assert_eq!(flow.proceed().await.unwrap(), CheckoutState::OrderReview);
    assert!(flow.history().contains(&CheckoutState::AddressReview));
    assert!(!flow.history().contains(&CheckoutState::AuthGate));
}

#[tokio::test]
async fn test_full_checkout_with_declined_then_accepted_card() {
    let store = MockStore::new();
    let session = store.session("pay");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    flow.add_product(1, 1).await.unwrap();
    flow.add_product(1, 1).await.unwrap();
    flow.proceed().await.unwrap();
    flow.login(EMAIL, PASSWORD).await.unwrap();
    assert_eq!(flow.confirm(Some("Ring twice")).await.unwrap(), CheckoutState::PaymentEntry);

    let declined = flow.pay(&PaymentDetails::with_card("0000 0000 0000 0000")).await.unwrap();
    assert!(matches!(declined, PaymentOutcome::Declined { .. }));
    assert_eq!(flow.state(), CheckoutState::OrderFailed);
    assert_eq!(store.orders_placed(), 0);

    assert_eq!(flow.retry_payment().await.unwrap(), CheckoutState::PaymentEntry);
    let placed = flow.pay(&PaymentDetails::default()).await.unwrap();
    assert_eq!(placed, PaymentOutcome::Placed);
    assert_eq!(flow.state(), CheckoutState::OrderPlaced);
    assert_eq!(store.orders_placed(), 1);
    assert!(store.account_cart(EMAIL).is_empty());
    assert!(flow.oracle().expected().is_empty());

    // A new order starts from the cart again
    let cart = flow.open_cart().await.unwrap();
    assert!(cart.is_empty());
}

#[tokio::test]
async fn test_retry_requires_a_declined_payment() {
    let store = MockStore::new();
    let session = store.session("retry");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    flow.open_cart().await.unwrap();
    let err = flow.retry_payment().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
}

#[tokio::test]
async fn test_order_comment_is_read_back() {
    let store = MockStore::new();
    let session = store.session("comment");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    flow.login(EMAIL, PASSWORD).await.unwrap();
    flow.add_product(6, 1).await.unwrap();
    flow.proceed().await.unwrap();

    let page = CheckoutPage::attach(&session).await.unwrap();
    page.comment("Please deliver after 6pm").await.unwrap();
    assert_eq!(page.total_amount().await.unwrap().as_deref(), Some("Rs. 400"));
    assert!(page.delivery_address().await.unwrap().contains("QA Tester"));
}

#[tokio::test]
async fn test_logout_returns_to_anonymous_and_keeps_account_cart() {
    let store = MockStore::new();
    let session = store.session("logout");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    flow.login(EMAIL, PASSWORD).await.unwrap();
    flow.add_product(5, 1).await.unwrap();
    assert_eq!(flow.logout().await.unwrap(), CheckoutState::Anonymous);
    assert!(!session.is_authenticated());
    assert_eq!(store.account_cart(EMAIL), vec![(5, 1)]);

    // The guest cart in this tab is empty again
    let cart = flow.open_cart().await.unwrap();
    assert!(cart.is_empty());
}

#[tokio::test]
async fn test_duplicate_rows_fail_the_merge_check() {
    let store = MockStore::new().with_faults(Faults {
        duplicate_rows: true,
        ..Faults::default()
    });
    let session = store.session("dup");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    flow.add_product(1, 1).await.unwrap();
    let err = flow.add_product(1, 1).await.unwrap_err();
    match err {
        E2eError::Check(Error::PriceInconsistency {
            scope,
            expected,
            observed,
        }) => {
            assert_eq!(scope, Scope::RowCount);
            assert_eq!(expected, Decimal::from(1));
            assert_eq!(observed, Decimal::from(2));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_skewed_line_total_is_reported_per_line() {
    let store = MockStore::new().with_faults(Faults {
        line_total_skew: Decimal::new(1, 2),
        ..Faults::default()
    });
    let session = store.session("skew");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    let err = flow.add_product(3, 1).await.unwrap_err();
    match err {
        E2eError::Check(Error::PriceInconsistency { scope, observed, .. }) => {
            assert!(matches!(scope, Scope::Line { product_id: 3, .. }));
            assert_eq!(observed, Decimal::new(100001, 2));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_epsilon_tolerates_small_skew() {
    let store = MockStore::new().with_faults(Faults {
        line_total_skew: Decimal::new(1, 2),
        ..Faults::default()
    });
    let session = store.session("epsilon");
    let mut flow = CheckoutFlow::new(&session, CartOracle::with_tolerance(Decimal::new(5, 2), 2));

    let cart = flow.add_product(3, 1).await.unwrap();
    assert_eq!(cart.quantity_of(3), 1);
}

#[tokio::test]
async fn test_wrong_grand_total_fails_order_review() {
    let store = MockStore::new().with_faults(Faults {
        grand_total_skew: Decimal::from(50),
        ..Faults::default()
    });
    let session = store.session("grand-total");
    let mut flow = CheckoutFlow::new(&session, CartOracle::new());

    flow.login(EMAIL, PASSWORD).await.unwrap();
    flow.add_product(1, 1).await.unwrap();
    let err = flow.proceed().await.unwrap_err();
    match err {
        E2eError::Check(Error::PriceInconsistency { scope, expected, observed }) => {
            assert_eq!(scope, Scope::GrandTotal);
            assert_eq!(expected, rs(500));
            assert_eq!(observed, rs(550));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(flow.state(), CheckoutState::AddressReview);
}
