//! Cart page

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shopcheck_common::ObservedRow;
use tracing::debug;

use super::{cell, checkout, parse_product_id, LoginPage, PageContext, PageKind, PageObject};
use crate::driver::WaitState;
use crate::error::{E2eError, E2eResult};
use crate::wait;

pub mod sel {
    use crate::driver::Column;

    pub const CART: &str = "#cart_items";
    pub const TABLE: &str = "#cart_info_table";
    pub const ROW: &str = "#cart_info_table tbody tr[id^='product-']";
    pub const ROW_COLUMNS: &[Column] = &[
        Column::attr("id", None, "id"),
        Column::text("name", ".cart_description h4 a"),
        Column::text("price", ".cart_price p"),
        Column::text("quantity", ".cart_quantity button"),
        Column::text("total", ".cart_total_price"),
    ];
    pub const EMPTY: &str = "#empty_cart";
    pub const PROCEED: &str = "a:has-text('Proceed To Checkout')";
    pub const CHECKOUT_MODAL: &str = "#checkoutModal";
    pub const MODAL_LOGIN: &str = "#checkoutModal a[href='/login']";

    pub fn row_for(product_id: u32) -> String {
        format!("tr#product-{}", product_id)
    }

    pub fn delete_button(product_id: u32) -> String {
        format!("a.cart_quantity_delete[data-product-id='{}']", product_id)
    }
}

/// Where "Proceed To Checkout" led
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProceedOutcome {
    /// The checkout page loaded
    Checkout,
    /// The site asked the guest to log in or register
    AuthRequired,
    /// Nothing to check out; the proceed control was not offered
    EmptyCart,
}

pub struct CartPage<'s> {
    ctx: PageContext<'s>,
}

#[async_trait]
impl<'s> PageObject<'s> for CartPage<'s> {
    const KIND: PageKind = PageKind::Cart;
    const LANDMARK: &'static str = sel::CART;

    async fn from_context(ctx: PageContext<'s>) -> E2eResult<Self> {
        Ok(Self { ctx })
    }
}

impl<'s> CartPage<'s> {
    /// Raw rows as displayed, for the oracle to normalize
    pub async fn rows(&self) -> E2eResult<Vec<ObservedRow>> {
        let rows = self.ctx.rows(sel::ROW, sel::ROW_COLUMNS).await?;
        rows.iter().map(|row| observed_row(row, sel::ROW)).collect()
    }

    pub async fn is_empty(&self) -> E2eResult<bool> {
        if self.ctx.is_visible(sel::EMPTY).await? {
            return Ok(true);
        }
        Ok(self.rows().await?.is_empty())
    }

    /// Wait for the "cart is empty" landmark
    pub async fn expect_empty(&self) -> E2eResult<()> {
        self.ctx.expect_visible(sel::EMPTY).await
    }

    /// Delete a product's row. `false` when the product is not in the cart.
    pub async fn remove(&self, product_id: u32) -> E2eResult<bool> {
        let row = sel::row_for(product_id);
        if !self.ctx.is_present(&row).await? {
            debug!("product {} not in cart, nothing to remove", product_id);
            return Ok(false);
        }
        self.ctx.click(&sel::delete_button(product_id)).await?;

        let session = self.ctx.session();
        let timeouts = session.timeouts();
        wait::wait_for(
            session.driver(),
            &row,
            WaitState::Detached,
            timeouts.landmark,
            timeouts.poll_interval,
        )
        .await?;
        Ok(true)
    }

    pub async fn proceed(&self) -> E2eResult<ProceedOutcome> {
        if self.is_empty().await? {
            return Ok(ProceedOutcome::EmptyCart);
        }
        self.ctx.click(sel::PROCEED).await?;
        let outcome = match self
            .ctx
            .expect_any(&[checkout::sel::ADDRESS_DETAILS, sel::CHECKOUT_MODAL])
            .await?
        {
            0 => ProceedOutcome::Checkout,
            _ => ProceedOutcome::AuthRequired,
        };
        debug!("proceed -> {:?}", outcome);
        Ok(outcome)
    }

    /// Follow the checkout modal's "Register / Login" link
    pub async fn login_from_modal(&self) -> E2eResult<LoginPage<'s>> {
        self.ctx.click(sel::MODAL_LOGIN).await?;
        LoginPage::attach(self.ctx.session()).await
    }
}

/// Convert a row read with [`sel::ROW_COLUMNS`]
pub(crate) fn observed_row(row: &crate::driver::Row, row_selector: &str) -> E2eResult<ObservedRow> {
    let raw_id = cell(row, "id", row_selector)?;
    let product_id = parse_product_id(&raw_id)
        .ok_or_else(|| E2eError::driver(row_selector, format!("unreadable row id '{}'", raw_id)))?;
    Ok(ObservedRow {
        product_id,
        name: cell(row, "name", row_selector)?,
        unit_price: cell(row, "price", row_selector)?,
        quantity: cell(row, "quantity", row_selector)?,
        line_total: cell(row, "total", row_selector)?,
    })
}
