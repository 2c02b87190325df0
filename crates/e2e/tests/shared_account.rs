//! Two sessions on one account: the server-side cart is shared

use shopcheck_common::{CartOracle, CheckoutState};
use shopcheck_e2e::mock::MockStore;
use shopcheck_e2e::pages::AccountDetails;
use shopcheck_e2e::{CheckoutFlow, Session};

async fn logged_in<'s>(session: &'s Session, email: &str, password: &str) -> CheckoutFlow<'s> {
    let mut flow = CheckoutFlow::new(session, CartOracle::new());
    assert!(flow.login(email, password).await.unwrap().is_authenticated());
    flow
}

#[tokio::test]
async fn test_other_tab_sees_the_same_cart() {
    let store = MockStore::new();
    let first = store.session("tab-a");
    let second = store.session("tab-b");
    let mut a = logged_in(&first, "valid@user.com", "Valid123!").await;
    let mut b = logged_in(&second, "valid@user.com", "Valid123!").await;

    a.add_product(1, 1).await.unwrap();
    let seen = b.open_cart().await.unwrap();
    assert_eq!(seen.quantity_of(1), 1);
}

#[tokio::test]
async fn test_add_after_concurrent_write_verifies_against_fresh_read() {
    let store = MockStore::new();
    let first = store.session("tab-a");
    let second = store.session("tab-b");
    let mut a = logged_in(&first, "valid@user.com", "Valid123!").await;
    let mut b = logged_in(&second, "valid@user.com", "Valid123!").await;

    a.add_product(1, 1).await.unwrap();
    b.add_product(2, 1).await.unwrap();

    // a never saw product 2 being added; its next add still checks out
    let cart = a.add_product(1, 1).await.unwrap();
    assert_eq!(cart.quantity_of(1), 2);
    assert_eq!(cart.quantity_of(2), 1);
    assert_eq!(a.oracle().expected().quantity_of(2), 1);
    assert_eq!(store.account_cart("valid@user.com"), vec![(1, 2), (2, 1)]);
}

#[tokio::test]
async fn test_proceed_adopts_lines_added_elsewhere() {
    let store = MockStore::new();
    let first = store.session("tab-a");
    let second = store.session("tab-b");
    let mut a = logged_in(&first, "valid@user.com", "Valid123!").await;
    let mut b = logged_in(&second, "valid@user.com", "Valid123!").await;

    a.add_product(3, 1).await.unwrap();
    b.add_product(6, 2).await.unwrap();

    assert_eq!(a.proceed().await.unwrap(), CheckoutState::OrderReview);
    assert_eq!(a.oracle().expected().len(), 2);
}

#[tokio::test]
async fn test_removal_elsewhere_is_not_a_failure() {
    let store = MockStore::new();
    let first = store.session("tab-a");
    let second = store.session("tab-b");
    let mut a = logged_in(&first, "valid@user.com", "Valid123!").await;
    let mut b = logged_in(&second, "valid@user.com", "Valid123!").await;

    a.add_product(1, 1).await.unwrap();
    a.add_product(5, 1).await.unwrap();
    b.remove_product(1).await.unwrap();

    let cart = a.remove_product(5).await.unwrap();
    assert!(cart.is_empty());
}

#[tokio::test]
async fn test_unique_accounts_do_not_share_carts() {
    let store = MockStore::new();
    let first_details = AccountDetails::unique("iso-a");
    let second_details = AccountDetails::unique("iso-b");

    let first = store.session("tab-a");
    let mut a = CheckoutFlow::new(&first, CartOracle::new());
    a.register(&first_details).await.unwrap();
    let second = store.session("tab-b");
    let mut b = CheckoutFlow::new(&second, CartOracle::new());
    b.register(&second_details).await.unwrap();

    a.add_product(4, 1).await.unwrap();
    let cart = b.add_product(2, 1).await.unwrap();

    assert_eq!(cart.len(), 1);
    assert_eq!(store.account_cart(&first_details.email), vec![(4, 1)]);
    assert_eq!(store.account_cart(&second_details.email), vec![(2, 1)]);
}

#[tokio::test]
async fn test_guest_carts_are_per_tab() {
    let store = MockStore::new();
    let first = store.session("guest-a");
    let second = store.session("guest-b");
    let mut a = CheckoutFlow::new(&first, CartOracle::new());
    let mut b = CheckoutFlow::new(&second, CartOracle::new());

    a.add_product(1, 1).await.unwrap();
    assert!(b.open_cart().await.unwrap().is_empty());
}
