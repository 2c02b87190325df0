//! Cart data model
//!
//! [`CartSnapshot`] is the oracle's computed view of a cart. Adding a product
//! that is already present increments its line (merge-by-identity); lines
//! never duplicate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Read-only reference to a catalog item, as seen on a listing or detail page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: u32,
    pub name: String,
    pub unit_price: Decimal,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl ProductRef {
    pub fn new(id: u32, name: impl Into<String>, unit_price: Decimal) -> Self {
        Self {
            id,
            name: name.into(),
            unit_price,
            available: true,
        }
    }
}

/// One row of a cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: u32,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

impl CartLine {
    pub fn new(product: &ProductRef, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.unit_price,
            quantity,
            line_total: product.unit_price * Decimal::from(quantity),
        }
    }

    fn recompute(&mut self) {
        self.line_total = self.unit_price * Decimal::from(self.quantity);
    }
}

/// Ordered cart lines plus their total
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    lines: Vec<CartLine>,
    total: Decimal,
}

impl CartSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from lines as observed, keeping their displayed totals.
    ///
    /// The displayed `total` is what the page claims; nothing is recomputed.
    pub fn from_observed(lines: Vec<CartLine>, total: Decimal) -> Self {
        Self { lines, total }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, product_id: u32) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    pub fn quantity_of(&self, product_id: u32) -> u32 {
        self.line(product_id).map(|l| l.quantity).unwrap_or(0)
    }

    /// Add `quantity` of `product`, merging into an existing line
    pub fn add(&mut self, product: &ProductRef, quantity: u32) {
        match self.lines.iter_mut().find(|l| l.product_id == product.id) {
            Some(line) => {
                line.quantity += quantity;
                line.recompute();
            }
            None => self.lines.push(CartLine::new(product, quantity)),
        }
        self.retotal();
    }

    /// Remove a line; returns whether it was present
    pub fn remove(&mut self, product_id: u32) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.retotal();
        self.lines.len() != before
    }

    /// Set a line's quantity; zero removes it
    pub fn set_quantity(&mut self, product_id: u32, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(product_id);
        }
        let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) else {
            return false;
        };
        line.quantity = quantity;
        line.recompute();
        self.retotal();
        true
    }

    /// Merge another cart's lines into this one, summing shared products
    pub fn merge(&mut self, other: &CartSnapshot) {
        for line in &other.lines {
            let product = ProductRef::new(line.product_id, line.name.clone(), line.unit_price);
            self.add(&product, line.quantity);
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.total = Decimal::ZERO;
    }

    fn retotal(&mut self) {
        self.total = self.lines.iter().map(|l| l.line_total).sum();
    }
}

/// One cart table row exactly as read from the page, before normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedRow {
    pub product_id: u32,
    pub name: String,
    pub unit_price: String,
    pub quantity: String,
    pub line_total: String,
}
