//! Checkout flow controller
//!
//! [`CheckoutFlow`] drives page objects in the order the
//! [`CheckoutMachine`] allows, consulting the [`CartOracle`] at every cart
//! checkpoint. Each operation checks its origin state before touching the
//! page, so a scenario that tries to skip a step fails with
//! `InvalidTransition` instead of performing the skipped step.
//!
//! Cart checks always start from a fresh read of the cart page. Another
//! browser context logged into the same account may have written to the
//! cart since the last observation.

use shopcheck_common::{CartOracle, CartSnapshot, CheckoutMachine, CheckoutState, Error};
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};
use crate::pages::{
    AccountDetails, CartPage, CheckoutPage, LoginOutcome, LoginPage, PageObject, PaymentDetails, PaymentOutcome,
    PaymentPage, ProceedOutcome, ProductDetailsPage, ProductsPage, RegistrationOutcome, RegistrationPage,
};
use crate::session::Session;

pub struct CheckoutFlow<'s> {
    session: &'s Session,
    machine: CheckoutMachine,
    oracle: CartOracle,
}

impl<'s> CheckoutFlow<'s> {
    pub fn new(session: &'s Session, oracle: CartOracle) -> Self {
        Self {
            session,
            machine: CheckoutMachine::new(),
            oracle,
        }
    }

    pub fn session(&self) -> &'s Session {
        self.session
    }

    pub fn state(&self) -> CheckoutState {
        self.machine.state()
    }

    pub fn history(&self) -> &[CheckoutState] {
        self.machine.history()
    }

    pub fn oracle(&self) -> &CartOracle {
        &self.oracle
    }

    /// Open the cart page and return its verified contents
    pub async fn open_cart(&mut self) -> E2eResult<CartSnapshot> {
        self.machine.open_cart()?;
        self.observe_cart().await
    }

    /// Fresh read of the cart page, arithmetic-checked. Does not change state.
    pub async fn observe_cart(&self) -> E2eResult<CartSnapshot> {
        let page = CartPage::open(self.session).await?;
        self.snapshot(&page).await
    }

    async fn snapshot(&self, page: &CartPage<'_>) -> E2eResult<CartSnapshot> {
        let rows = page.rows().await?;
        Ok(self.oracle.observe(&rows, None)?)
    }

    /// Add `quantity` of a product and verify the cart merged it.
    ///
    /// A single unit is added from the product listing, larger quantities
    /// from the product details page.
    pub async fn add_product(&mut self, product_id: u32, quantity: u32) -> E2eResult<CartSnapshot> {
        if quantity == 0 {
            return Err(E2eError::Expectation {
                context: format!("add product {}", product_id),
                expected: "a positive quantity".to_string(),
                observed: "0".to_string(),
            });
        }
        self.machine.open_cart()?;
        let before = self.observe_cart().await?;

        let product = if quantity == 1 {
            ProductsPage::open(self.session).await?.add_to_cart(product_id).await?
        } else {
            ProductDetailsPage::open_product(self.session, product_id)
                .await?
                .add_to_cart(quantity)
                .await?
        };

        let after = self.observe_cart().await?;
        self.oracle.verify_merge(&before, &after, product_id, quantity)?;
        self.oracle.adopt(&before);
        self.oracle.record_add(&product, quantity);
        self.oracle.verify_expected(&after)?;

        info!(
            "[{}] added {} x {} (#{}), cart total {}",
            self.session.label(),
            quantity,
            product.name,
            product_id,
            after.total()
        );
        Ok(after)
    }

    /// Remove a product's line. Removing the last line must show the empty-cart landmark.
    pub async fn remove_product(&mut self, product_id: u32) -> E2eResult<CartSnapshot> {
        self.machine.open_cart()?;
        let page = CartPage::open(self.session).await?;
        let before = self.snapshot(&page).await?;

        if !page.remove(product_id).await? {
            debug!("product {} was not in the cart", product_id);
        }
        let after = self.snapshot(&page).await?;
        if after.is_empty() {
            page.expect_empty().await?;
        }

        self.oracle.adopt(&before);
        self.oracle.record_remove(product_id);
        self.oracle.verify_expected(&after)?;
        Ok(after)
    }

    /// Leave the cart towards checkout.
    ///
    /// Authenticated sessions land on the order review; guests stop at the
    /// auth gate. An empty cart is `EmptyCart` and the state stays `CartReview`.
    pub async fn proceed(&mut self) -> E2eResult<CheckoutState> {
        let checkpoint = self.machine.clone();
        let result = self.proceed_from_cart().await;
        self.settle(checkpoint, result)
    }

    async fn proceed_from_cart(&mut self) -> E2eResult<CheckoutState> {
        if self.machine.state() != CheckoutState::CartReview {
            return Err(Error::InvalidTransition {
                from: self.machine.state(),
                action: "proceed to checkout",
            }
            .into());
        }

        let page = CartPage::open(self.session).await?;
        let cart = self.snapshot(&page).await?;
        self.oracle.adopt(&cart);

        let authenticated = self.session.is_authenticated();
        self.machine.proceed(authenticated, cart.len())?;

        match (page.proceed().await?, authenticated) {
            (ProceedOutcome::Checkout, true) => self.review_order().await?,
            (ProceedOutcome::AuthRequired, false) => {}
            (outcome, _) => {
                return Err(E2eError::Expectation {
                    context: "proceed to checkout".to_string(),
                    expected: if authenticated { "checkout page" } else { "login prompt" }.to_string(),
                    observed: format!("{:?}", outcome),
                })
            }
        }
        Ok(self.machine.state())
    }

    /// Check the address and the order table, then move to `OrderReview`
    async fn review_order(&mut self) -> E2eResult<()> {
        let page = CheckoutPage::attach(self.session).await?;
        let address = page.delivery_address().await?;
        debug!("delivery address: {}", address.replace('\n', ", "));

        let rows = page.rows().await?;
        let total = page.total_amount().await?;
        let shown = self.oracle.observe(&rows, total.as_deref())?;
        self.oracle.verify_expected(&shown)?;

        self.machine.address_verified()?;
        Ok(())
    }

    /// Log in. A guest's cart must survive as part of the account cart; at
    /// the auth gate a success continues to `OrderReview`.
    pub async fn login(&mut self, email: &str, password: &str) -> E2eResult<LoginOutcome> {
        let guest = self.guest_cart();
        let checkpoint = self.machine.clone();
        let result = self.submit_login(email, password, guest).await;
        self.settle(checkpoint, result)
    }

    async fn submit_login(
        &mut self,
        email: &str,
        password: &str,
        guest: Option<CartSnapshot>,
    ) -> E2eResult<LoginOutcome> {
        let page = LoginPage::open(self.session).await?;
        let outcome = page.login(email, password).await?;
        if outcome.is_authenticated() {
            self.after_authentication(guest).await?;
        }
        Ok(outcome)
    }

    /// Register a new account; the guest cart is checked like `login`
    pub async fn register(&mut self, details: &AccountDetails) -> E2eResult<RegistrationOutcome> {
        let guest = self.guest_cart();
        let checkpoint = self.machine.clone();
        let result = self.submit_registration(details, guest).await;
        self.settle(checkpoint, result)
    }

    async fn submit_registration(
        &mut self,
        details: &AccountDetails,
        guest: Option<CartSnapshot>,
    ) -> E2eResult<RegistrationOutcome> {
        let page = RegistrationPage::open(self.session).await?;
        let outcome = page.register(details).await?;
        if matches!(outcome, RegistrationOutcome::Created { .. }) {
            self.after_authentication(guest).await?;
        }
        Ok(outcome)
    }

    /// What this tab held as a guest, if it is still a guest
    fn guest_cart(&self) -> Option<CartSnapshot> {
        (!self.session.is_authenticated()).then(|| self.oracle.expected().clone())
    }

    async fn after_authentication(&mut self, guest: Option<CartSnapshot>) -> E2eResult<()> {
        if self.machine.state() != CheckoutState::AuthGate {
            if let Some(guest) = guest.filter(|cart| !cart.is_empty()) {
                let merged = self.observe_cart().await?;
                self.oracle.verify_guest_merge(&guest, &merged)?;
                self.oracle.adopt(&merged);
                debug!("guest cart of {} lines merged on login", guest.len());
            }
            return Ok(());
        }
        // A retried gate login finds the session already authenticated
        let guest = guest.unwrap_or_else(|| self.oracle.expected().clone());
        self.machine.authenticated()?;

        let page = CartPage::open(self.session).await?;
        let merged = self.snapshot(&page).await?;
        self.oracle.verify_guest_merge(&guest, &merged)?;
        self.oracle.adopt(&merged);

        match page.proceed().await? {
            ProceedOutcome::Checkout => self.review_order().await,
            outcome => Err(E2eError::Expectation {
                context: "checkout after login".to_string(),
                expected: "checkout page".to_string(),
                observed: format!("{:?}", outcome),
            }),
        }
    }

    /// Confirm the reviewed order, optionally with a comment, and open payment
    pub async fn confirm(&mut self, comment: Option<&str>) -> E2eResult<CheckoutState> {
        let checkpoint = self.machine.clone();
        let result = self.place_order(comment).await;
        self.settle(checkpoint, result)
    }

    async fn place_order(&mut self, comment: Option<&str>) -> E2eResult<CheckoutState> {
        self.machine.confirm()?;
        let page = CheckoutPage::attach(self.session).await?;
        if let Some(text) = comment {
            page.comment(text).await?;
        }
        page.place_order().await?;
        Ok(self.machine.state())
    }

    pub async fn pay(&mut self, details: &PaymentDetails) -> E2eResult<PaymentOutcome> {
        if self.machine.state() != CheckoutState::PaymentEntry {
            return Err(Error::InvalidTransition {
                from: self.machine.state(),
                action: "submit payment",
            }
            .into());
        }
        let outcome = PaymentPage::attach(self.session).await?.pay(details).await?;
        match &outcome {
            PaymentOutcome::Placed => {
                self.machine.payment_accepted()?;
                self.oracle.record_clear();
            }
            PaymentOutcome::Declined { .. } => {
                self.machine.payment_declined()?;
            }
        }
        Ok(outcome)
    }

    /// Back to the payment form after a decline
    pub async fn retry_payment(&mut self) -> E2eResult<CheckoutState> {
        let checkpoint = self.machine.clone();
        let result = match self.machine.retry_payment() {
            Ok(state) => PaymentPage::attach(self.session).await.map(|_| state),
            Err(e) => Err(e.into()),
        };
        self.settle(checkpoint, result)
    }

    /// Log out from any state. The account cart stays on the server; this
    /// tab is a guest with its own cart again.
    pub async fn logout(&mut self) -> E2eResult<CheckoutState> {
        LoginPage::logout(self.session).await?;
        self.oracle.record_clear();
        Ok(self.machine.logout())
    }

    /// Undo the transitions of a step that failed with a retryable error, so
    /// the machine matches the page the browser is still on.
    fn settle<T>(&mut self, checkpoint: CheckoutMachine, result: E2eResult<T>) -> E2eResult<T> {
        if let Err(e) = &result {
            if e.is_retryable() && self.machine.state() != checkpoint.state() {
                debug!(
                    "[{}] {} after {}, back to {}",
                    self.session.label(),
                    e.kind(),
                    self.machine.state(),
                    checkpoint.state()
                );
                self.machine = checkpoint;
            }
        }
        result
    }
}
