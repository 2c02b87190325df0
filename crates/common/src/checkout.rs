//! Checkout state machine
//!
//! ```text
//!  Anonymous ──open_cart──▶ CartReview ──proceed(guest)──▶ AuthGate
//!                               │                            │ authenticated
//!                               │ proceed(signed in)         ▼
//!                               └─────────────────────▶ AddressReview
//!                                                            │ address_verified
//!                                                            ▼
//!   OrderFailed ◀──declined── PaymentEntry ◀──confirm── OrderReview
//!        │                        │ accepted
//!        └──retry──▶ PaymentEntry └──────▶ OrderPlaced
//!
//!  any ──logout──▶ Anonymous
//! ```
//!
//! Every transition checks its origin state. A skipped step is an
//! [`Error::InvalidTransition`], never performed implicitly.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    Anonymous,
    CartReview,
    AuthGate,
    AddressReview,
    OrderReview,
    PaymentEntry,
    OrderPlaced,
    OrderFailed,
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckoutState::Anonymous => "Anonymous",
            CheckoutState::CartReview => "CartReview",
            CheckoutState::AuthGate => "AuthGate",
            CheckoutState::AddressReview => "AddressReview",
            CheckoutState::OrderReview => "OrderReview",
            CheckoutState::PaymentEntry => "PaymentEntry",
            CheckoutState::OrderPlaced => "OrderPlaced",
            CheckoutState::OrderFailed => "OrderFailed",
        };
        f.write_str(s)
    }
}

/// Pure transition logic; the browser-facing controller drives it
#[derive(Debug, Clone)]
pub struct CheckoutMachine {
    state: CheckoutState,
    history: Vec<CheckoutState>,
}

impl Default for CheckoutMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutMachine {
    pub fn new() -> Self {
        Self {
            state: CheckoutState::Anonymous,
            history: vec![CheckoutState::Anonymous],
        }
    }

    pub fn state(&self) -> CheckoutState {
        self.state
    }

    /// Every state entered so far, in order, starting with `Anonymous`
    pub fn history(&self) -> &[CheckoutState] {
        &self.history
    }

    /// Open the cart. Allowed from `Anonymous`, `CartReview`, and after an
    /// order was placed (starting the next order).
    pub fn open_cart(&mut self) -> Result<CheckoutState> {
        self.require(
            &[
                CheckoutState::Anonymous,
                CheckoutState::CartReview,
                CheckoutState::OrderPlaced,
            ],
            "open the cart",
        )?;
        Ok(self.enter(CheckoutState::CartReview))
    }

    /// Leave the cart towards checkout.
    ///
    /// An empty cart is an [`Error::EmptyCart`] and the state stays `CartReview`.
    pub fn proceed(&mut self, authenticated: bool, cart_lines: usize) -> Result<CheckoutState> {
        self.require(&[CheckoutState::CartReview], "proceed to checkout")?;
        if cart_lines == 0 {
            return Err(Error::EmptyCart);
        }
        let next = if authenticated {
            CheckoutState::AddressReview
        } else {
            CheckoutState::AuthGate
        };
        Ok(self.enter(next))
    }

    /// Login or registration succeeded at the gate
    pub fn authenticated(&mut self) -> Result<CheckoutState> {
        self.require(&[CheckoutState::AuthGate], "complete authentication")?;
        Ok(self.enter(CheckoutState::AddressReview))
    }

    /// Address details were shown and checked
    pub fn address_verified(&mut self) -> Result<CheckoutState> {
        self.require(&[CheckoutState::AddressReview], "verify the address")?;
        Ok(self.enter(CheckoutState::OrderReview))
    }

    /// Order confirmed (comment optional), moving on to payment
    pub fn confirm(&mut self) -> Result<CheckoutState> {
        self.require(&[CheckoutState::OrderReview], "confirm the order")?;
        Ok(self.enter(CheckoutState::PaymentEntry))
    }

    pub fn payment_accepted(&mut self) -> Result<CheckoutState> {
        self.require(&[CheckoutState::PaymentEntry], "place the order")?;
        Ok(self.enter(CheckoutState::OrderPlaced))
    }

    pub fn payment_declined(&mut self) -> Result<CheckoutState> {
        self.require(&[CheckoutState::PaymentEntry], "record a declined payment")?;
        Ok(self.enter(CheckoutState::OrderFailed))
    }

    pub fn retry_payment(&mut self) -> Result<CheckoutState> {
        self.require(&[CheckoutState::OrderFailed], "retry payment")?;
        Ok(self.enter(CheckoutState::PaymentEntry))
    }

    /// Logout is valid from any state
    pub fn logout(&mut self) -> CheckoutState {
        self.enter(CheckoutState::Anonymous)
    }

    fn require(&self, allowed: &[CheckoutState], action: &'static str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }

    fn enter(&mut self, next: CheckoutState) -> CheckoutState {
        if next != self.state {
            info!("checkout: {} -> {}", self.state, next);
        }
        self.state = next;
        self.history.push(next);
        next
    }
}
