//! Page objects
//!
//! One typed facade per storefront page. Each page declares a ready
//! landmark; attaching to a page waits for it (bounded, retried once on
//! timeout) and fails with [`Error::PageState`] naming the landmark if it
//! never shows. Selectors that vary between site builds are resolved once
//! at attach time through [`PageContext::resolve`], never per call.
//!
//! Every interaction goes through [`PageContext`], which clears
//! obstructions with the session's [`OverlayGuard`](crate::overlay::OverlayGuard)
//! before touching the target.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shopcheck_common::Error;
use tracing::debug;

use crate::driver::{Column, PageDriver, Row, WaitState};
use crate::error::{E2eError, E2eResult};
use crate::session::Session;
use crate::wait;

pub mod cart;
pub mod checkout;
pub mod contact;
pub mod login;
pub mod payment;
pub mod products;
pub mod registration;

pub use cart::{CartPage, ProceedOutcome};
pub use checkout::CheckoutPage;
pub use contact::{ContactMessage, ContactPage};
pub use login::{LoginOutcome, LoginPage};
pub use payment::{PaymentDetails, PaymentOutcome, PaymentPage};
pub use products::{ProductDetailsPage, ProductsPage, SearchResults};
pub use registration::{AccountDetails, RegistrationOutcome, RegistrationPage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Login,
    Registration,
    Products,
    Cart,
    Checkout,
    Payment,
    Contact,
}

impl PageKind {
    pub fn name(&self) -> &'static str {
        match self {
            PageKind::Login => "Login",
            PageKind::Registration => "Registration",
            PageKind::Products => "Products",
            PageKind::Cart => "Cart",
            PageKind::Checkout => "Checkout",
            PageKind::Payment => "Payment",
            PageKind::Contact => "Contact",
        }
    }

    pub fn route(&self) -> &'static str {
        match self {
            PageKind::Login => "/login",
            PageKind::Registration => "/login",
            PageKind::Products => "/products",
            PageKind::Cart => "/view_cart",
            PageKind::Checkout => "/checkout",
            PageKind::Payment => "/payment",
            PageKind::Contact => "/contact_us",
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A page variant with a ready landmark
#[async_trait]
pub trait PageObject<'s>: Sized + Send {
    const KIND: PageKind;
    const LANDMARK: &'static str;

    /// Build the page once its landmark is visible
    async fn from_context(ctx: PageContext<'s>) -> E2eResult<Self>;

    /// Attach to the page the browser is already on
    async fn attach(session: &'s Session) -> E2eResult<Self> {
        let ctx = PageContext::attach(session, Self::KIND, Self::LANDMARK).await?;
        Self::from_context(ctx).await
    }

    /// Navigate to the page's route, then attach
    async fn open(session: &'s Session) -> E2eResult<Self> {
        session.goto(Self::KIND.route()).await?;
        Self::attach(session).await
    }
}

/// Shared machinery behind every page object
pub struct PageContext<'s> {
    session: &'s Session,
    kind: PageKind,
    landmark: &'static str,
}

impl<'s> PageContext<'s> {
    pub async fn attach(session: &'s Session, kind: PageKind, landmark: &'static str) -> E2eResult<Self> {
        let ctx = Self {
            session,
            kind,
            landmark,
        };
        ctx.wait_ready().await?;
        debug!("[{}] attached to {} page", session.label(), kind);
        Ok(ctx)
    }

    pub fn session(&self) -> &'s Session {
        self.session
    }

    pub fn kind(&self) -> PageKind {
        self.kind
    }

    fn driver(&self) -> &'s dyn PageDriver {
        self.session.driver()
    }

    /// Pick the first candidate present on the page, falling back to the first
    pub async fn resolve(&self, candidates: &[&'static str]) -> E2eResult<&'static str> {
        for candidate in candidates {
            if self.driver().is_present(candidate).await? {
                return Ok(candidate);
            }
        }
        candidates
            .first()
            .copied()
            .ok_or_else(|| E2eError::Config(format!("{} page: empty selector candidate list", self.kind)))
    }

    /// Wait for this page's ready landmark
    pub async fn wait_ready(&self) -> E2eResult<()> {
        self.expect_visible(self.landmark).await
    }

    /// Wait for `selector`, retrying once on timeout; a second timeout is a
    /// [`Error::PageState`] naming the selector.
    pub async fn expect_visible(&self, selector: &str) -> E2eResult<()> {
        let timeouts = self.session.timeouts();
        let driver = self.driver();
        let waited = wait::retry_on_timeout(timeouts.retry_backoff, move || {
            wait::wait_for(
                driver,
                selector,
                WaitState::Visible,
                timeouts.landmark,
                timeouts.poll_interval,
            )
        })
        .await;

        match waited {
            Err(E2eError::Check(Error::Timeout { .. })) => Err(Error::page_state(self.kind.name(), selector).into()),
            other => other,
        }
    }

    /// Wait until any of `selectors` shows; returns the index of the first seen
    pub async fn expect_any(&self, selectors: &[&str]) -> E2eResult<usize> {
        let timeouts = self.session.timeouts();
        let driver = self.driver();
        let waited = wait::retry_on_timeout(timeouts.retry_backoff, move || {
            wait::wait_for_any(driver, selectors, timeouts.landmark, timeouts.poll_interval)
        })
        .await;

        match waited {
            Err(E2eError::Check(Error::Timeout { .. })) => {
                Err(Error::page_state(self.kind.name(), selectors.join(" | ")).into())
            }
            other => other,
        }
    }

    pub async fn expect_hidden(&self, selector: &str) -> E2eResult<()> {
        let timeouts = self.session.timeouts();
        wait::wait_for(
            self.driver(),
            selector,
            WaitState::Hidden,
            timeouts.landmark,
            timeouts.poll_interval,
        )
        .await
    }

    /// Clear obstructions before acting on `target`
    async fn guard(&self, target: &str) -> E2eResult<()> {
        let report = self.session.guard().ensure_interactable(self.driver(), target).await?;
        for warning in report.warnings {
            self.session.warn(warning);
        }
        Ok(())
    }

    pub async fn fill(&self, selector: &str, value: &str) -> E2eResult<()> {
        self.guard(selector).await?;
        self.expect_visible(selector).await?;
        self.driver().fill(selector, value).await
    }

    pub async fn click(&self, selector: &str) -> E2eResult<()> {
        self.guard(selector).await?;
        self.expect_visible(selector).await?;
        self.driver().click(selector).await
    }

    /// Click only if `selector` is present; returns whether it clicked
    pub async fn click_if_present(&self, selector: &str) -> E2eResult<bool> {
        if !self.is_visible(selector).await? {
            return Ok(false);
        }
        self.click(selector).await?;
        Ok(true)
    }

    pub async fn is_visible(&self, selector: &str) -> E2eResult<bool> {
        self.driver().is_visible(selector).await
    }

    pub async fn is_present(&self, selector: &str) -> E2eResult<bool> {
        self.driver().is_present(selector).await
    }

    pub async fn count(&self, selector: &str) -> E2eResult<usize> {
        self.driver().count(selector).await
    }

    pub async fn text(&self, selector: &str) -> E2eResult<String> {
        self.driver().text(selector).await
    }

    pub async fn input_value(&self, selector: &str) -> E2eResult<String> {
        self.driver().input_value(selector).await
    }

    pub async fn rows(&self, row_selector: &str, columns: &[Column]) -> E2eResult<Vec<Row>> {
        self.driver().query_all(row_selector, columns).await
    }

    pub async fn goto(&self, route: &str) -> E2eResult<()> {
        self.session.goto(route).await
    }
}

/// Guarded click on site-wide chrome (header links) outside any one page
pub(crate) async fn click_anywhere(session: &Session, selector: &str) -> E2eResult<()> {
    let report = session.guard().ensure_interactable(session.driver(), selector).await?;
    for warning in report.warnings {
        session.warn(warning);
    }
    session.driver().click(selector).await
}

/// Read a required cell, reporting the row selector when it is missing
pub(crate) fn cell(row: &Row, column: &str, row_selector: &str) -> E2eResult<String> {
    row.get(column)
        .cloned()
        .ok_or_else(|| E2eError::driver(row_selector, format!("row has no '{}' cell", column)))
}

/// `product-12` or `12` to 12
pub(crate) fn parse_product_id(raw: &str) -> Option<u32> {
    raw.rsplit(|c: char| !c.is_ascii_digit())
        .find(|part| !part.is_empty())
        .and_then(|digits| digits.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("product-12" => Some(12); "row id")]
    #[test_case("12" => Some(12); "bare")]
    #[test_case("/product_details/7" => Some(7); "href")]
    #[test_case("product-" => None; "no digits")]
    fn test_parse_product_id(raw: &str) -> Option<u32> {
        parse_product_id(raw)
    }

    #[test_case(PageKind::Login => "/login")]
    #[test_case(PageKind::Registration => "/login"; "signup form lives on the login page")]
    #[test_case(PageKind::Cart => "/view_cart")]
    #[test_case(PageKind::Payment => "/payment")]
    fn test_routes(kind: PageKind) -> &'static str {
        kind.route()
    }
}
