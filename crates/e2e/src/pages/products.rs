//! Product listing, search, and product details

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shopcheck_common::{normalize_amount, ProductRef};
use tracing::debug;

use super::{cell, parse_product_id, PageContext, PageKind, PageObject};
use crate::error::{E2eError, E2eResult};
use crate::session::Session;

pub mod sel {
    use crate::driver::Column;

    pub const LISTING: &str = ".features_items";
    pub const SEARCH_INPUT: &str = "#search_product";
    pub const SEARCH_SUBMIT: &str = "#submit_search";
    pub const SEARCHED: &str = "h2.title:has-text('Searched Products')";

    pub const CARD: &str = ".features_items .product-image-wrapper";
    pub const CARD_COLUMNS: &[Column] = &[
        Column::text("name", ".productinfo p"),
        Column::text("price", ".productinfo h2"),
        Column::attr("id", Some(".productinfo a.add-to-cart"), "data-product-id"),
    ];

    pub const CART_MODAL: &str = "#cartModal";
    pub const CONTINUE_SHOPPING: &str = "#cartModal button.close-modal";

    pub const DETAILS: &str = ".product-information";
    pub const DETAILS_NAME: &str = ".product-information h2";
    pub const DETAILS_PRICE: &str = ".product-information span span";
    pub const QUANTITY: &str = "#quantity";
    pub const ADD_FROM_DETAILS: &str = "button.cart";

    pub const REVIEW_NAME: &str = "#name";
    pub const REVIEW_EMAIL: &str = "#email";
    pub const REVIEW_TEXT: &str = "#review";
    pub const REVIEW_SUBMIT: &str = "#button-review";
    pub const REVIEW_THANKS: &str = "span:has-text('Thank you for your review.')";

    pub fn add_button(product_id: u32) -> String {
        format!(".productinfo a.add-to-cart[data-product-id='{}']", product_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub term: String,
    pub products: Vec<ProductRef>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn contains(&self, product_id: u32) -> bool {
        self.products.iter().any(|p| p.id == product_id)
    }
}

pub struct ProductsPage<'s> {
    ctx: PageContext<'s>,
}

#[async_trait]
impl<'s> PageObject<'s> for ProductsPage<'s> {
    const KIND: PageKind = PageKind::Products;
    const LANDMARK: &'static str = sel::LISTING;

    async fn from_context(ctx: PageContext<'s>) -> E2eResult<Self> {
        Ok(Self { ctx })
    }
}

impl<'s> ProductsPage<'s> {
    /// Every product card currently listed
    pub async fn products(&self) -> E2eResult<Vec<ProductRef>> {
        let rows = self.ctx.rows(sel::CARD, sel::CARD_COLUMNS).await?;
        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            let raw_id = cell(&row, "id", sel::CARD)?;
            let id = parse_product_id(&raw_id)
                .ok_or_else(|| E2eError::driver(sel::CARD, format!("unreadable product id '{}'", raw_id)))?;
            products.push(ProductRef::new(
                id,
                cell(&row, "name", sel::CARD)?,
                normalize_amount(&cell(&row, "price", sel::CARD)?)?,
            ));
        }
        Ok(products)
    }

    pub async fn product(&self, product_id: u32) -> E2eResult<ProductRef> {
        self.products()
            .await?
            .into_iter()
            .find(|p| p.id == product_id)
            .ok_or_else(|| E2eError::driver(sel::add_button(product_id), "product not listed"))
    }

    /// Search through the search box; the results heading must show for any term
    pub async fn search(&self, term: &str) -> E2eResult<SearchResults> {
        self.ctx.fill(sel::SEARCH_INPUT, term).await?;
        self.ctx.click(sel::SEARCH_SUBMIT).await?;
        self.ctx.expect_visible(sel::SEARCHED).await?;
        let products = self.products().await?;
        debug!("search '{}' -> {} product(s)", term, products.len());
        Ok(SearchResults {
            term: term.to_string(),
            products,
        })
    }

    /// Add one unit of `product_id` from the listing and close the
    /// confirmation modal. Returns the product as listed.
    pub async fn add_to_cart(&self, product_id: u32) -> E2eResult<ProductRef> {
        let product = self.product(product_id).await?;
        self.ctx.click(&sel::add_button(product_id)).await?;
        close_cart_modal(&self.ctx).await?;
        Ok(product)
    }
}

/// The "Added!" modal closes through Continue Shopping
async fn close_cart_modal(ctx: &PageContext<'_>) -> E2eResult<()> {
    ctx.expect_visible(sel::CART_MODAL).await?;
    ctx.click(sel::CONTINUE_SHOPPING).await?;
    ctx.expect_hidden(sel::CART_MODAL).await
}

pub struct ProductDetailsPage<'s> {
    ctx: PageContext<'s>,
    product_id: u32,
}

#[async_trait]
impl<'s> PageObject<'s> for ProductDetailsPage<'s> {
    const KIND: PageKind = PageKind::Products;
    const LANDMARK: &'static str = sel::DETAILS;

    async fn from_context(ctx: PageContext<'s>) -> E2eResult<Self> {
        let route = ctx.session().current_route().await?;
        let product_id = parse_product_id(&route)
            .ok_or_else(|| E2eError::driver(sel::DETAILS, format!("not a product details route: {}", route)))?;
        Ok(Self { ctx, product_id })
    }
}

impl<'s> ProductDetailsPage<'s> {
    pub async fn open_product(session: &'s Session, product_id: u32) -> E2eResult<Self> {
        session.goto(&format!("/product_details/{}", product_id)).await?;
        Self::attach(session).await
    }

    pub fn product_id(&self) -> u32 {
        self.product_id
    }

    pub async fn product(&self) -> E2eResult<ProductRef> {
        let name = self.ctx.text(sel::DETAILS_NAME).await?;
        let price = normalize_amount(&self.ctx.text(sel::DETAILS_PRICE).await?)?;
        Ok(ProductRef::new(self.product_id, name, price))
    }

    /// Add `quantity` units in one go
    pub async fn add_to_cart(&self, quantity: u32) -> E2eResult<ProductRef> {
        let product = self.product().await?;
        self.ctx.fill(sel::QUANTITY, &quantity.to_string()).await?;
        self.ctx.click(sel::ADD_FROM_DETAILS).await?;
        close_cart_modal(&self.ctx).await?;
        Ok(product)
    }

    /// Submit a review; true once the thank-you note shows
    pub async fn write_review(&self, name: &str, email: &str, review: &str) -> E2eResult<bool> {
        self.ctx.fill(sel::REVIEW_NAME, name).await?;
        self.ctx.fill(sel::REVIEW_EMAIL, email).await?;
        self.ctx.fill(sel::REVIEW_TEXT, review).await?;
        self.ctx.click(sel::REVIEW_SUBMIT).await?;
        self.ctx.expect_visible(sel::REVIEW_THANKS).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Column;

    #[test]
    fn test_add_button_targets_one_product() {
        assert_eq!(
            sel::add_button(3),
            ".productinfo a.add-to-cart[data-product-id='3']"
        );
    }

    #[test]
    fn test_card_columns_read_id_from_attribute() {
        let id: Vec<&Column> = sel::CARD_COLUMNS.iter().filter(|c| c.name == "id").collect();
        assert_eq!(id.len(), 1);
        assert_eq!(id[0].attribute, Some("data-product-id"));
    }
}
