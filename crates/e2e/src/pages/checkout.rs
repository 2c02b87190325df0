//! Checkout review page

use async_trait::async_trait;
use shopcheck_common::ObservedRow;

use super::cart::{self, observed_row};
use super::{PageContext, PageKind, PageObject, PaymentPage};
use crate::error::{E2eError, E2eResult};

pub mod sel {
    pub const ADDRESS_DETAILS: &str = "h2:has-text('Address Details')";
    pub const REVIEW_ORDER: &str = "h2:has-text('Review Your Order')";
    pub const DELIVERY_ADDRESS: &str = "#address_delivery";
    pub const EMPTY: &str = "b:has-text('Cart is empty!')";
    pub const TOTAL: &str = "#cart_info_table tr:has-text('Total Amount') .cart_total_price";
    pub const COMMENT: &str = "textarea[name='message']";
    pub const PLACE_ORDER: &str = "a[href='/payment']";
}

pub struct CheckoutPage<'s> {
    ctx: PageContext<'s>,
}

#[async_trait]
impl<'s> PageObject<'s> for CheckoutPage<'s> {
    const KIND: PageKind = PageKind::Checkout;
    const LANDMARK: &'static str = sel::ADDRESS_DETAILS;

    async fn from_context(ctx: PageContext<'s>) -> E2eResult<Self> {
        ctx.expect_visible(sel::REVIEW_ORDER).await?;
        Ok(Self { ctx })
    }
}

impl<'s> CheckoutPage<'s> {
    pub async fn delivery_address(&self) -> E2eResult<String> {
        self.ctx.expect_visible(sel::DELIVERY_ADDRESS).await?;
        self.ctx.text(sel::DELIVERY_ADDRESS).await
    }

    pub async fn rows(&self) -> E2eResult<Vec<ObservedRow>> {
        let rows = self.ctx.rows(cart::sel::ROW, cart::sel::ROW_COLUMNS).await?;
        rows.iter().map(|row| observed_row(row, cart::sel::ROW)).collect()
    }

    /// Raw "Total Amount" text, `None` when the row is absent
    pub async fn total_amount(&self) -> E2eResult<Option<String>> {
        if !self.ctx.is_present(sel::TOTAL).await? {
            return Ok(None);
        }
        self.ctx.text(sel::TOTAL).await.map(Some)
    }

    pub async fn is_empty(&self) -> E2eResult<bool> {
        self.ctx.is_visible(sel::EMPTY).await
    }

    /// Type the order comment and read it back
    pub async fn comment(&self, text: &str) -> E2eResult<()> {
        self.ctx.fill(sel::COMMENT, text).await?;
        let stored = self.ctx.input_value(sel::COMMENT).await?;
        if stored != text {
            return Err(E2eError::Expectation {
                context: "order comment".to_string(),
                expected: text.to_string(),
                observed: stored,
            });
        }
        Ok(())
    }

    pub async fn place_order(&self) -> E2eResult<PaymentPage<'s>> {
        self.ctx.click(sel::PLACE_ORDER).await?;
        PaymentPage::attach(self.ctx.session()).await
    }
}
