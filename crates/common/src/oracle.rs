//! Cart verification oracle
//!
//! [`CartOracle`] keeps an independently computed expectation of the cart and
//! checks displayed rows against both arithmetic and that expectation. It
//! never stores an observation: every check takes rows the caller has just
//! read, because another browser context may have written to the same
//! server-side cart in between.

use rust_decimal::Decimal;
use tracing::debug;

use crate::cart::{CartLine, CartSnapshot, ObservedRow, ProductRef};
use crate::error::{Error, Result, Scope};
use crate::money::{self, normalize_amount, normalize_quantity, round_price};

/// Independent cart expectation plus the checks that compare it to the page
#[derive(Debug, Clone)]
pub struct CartOracle {
    epsilon: Decimal,
    precision: u32,
    expected: CartSnapshot,
}

impl Default for CartOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl CartOracle {
    /// Exact comparison (epsilon 0) at two decimal places
    pub fn new() -> Self {
        Self {
            epsilon: Decimal::ZERO,
            precision: money::DEFAULT_PRECISION,
            expected: CartSnapshot::new(),
        }
    }

    /// Fixed tolerance for this oracle's lifetime. Negative epsilon is treated as 0.
    pub fn with_tolerance(epsilon: Decimal, precision: u32) -> Self {
        Self {
            epsilon: epsilon.max(Decimal::ZERO),
            precision,
            expected: CartSnapshot::new(),
        }
    }

    pub fn epsilon(&self) -> Decimal {
        self.epsilon
    }

    pub fn expected(&self) -> &CartSnapshot {
        &self.expected
    }

    pub fn record_add(&mut self, product: &ProductRef, quantity: u32) {
        self.expected.add(product, quantity);
    }

    pub fn record_remove(&mut self, product_id: u32) {
        self.expected.remove(product_id);
    }

    pub fn record_quantity(&mut self, product_id: u32, quantity: u32) {
        self.expected.set_quantity(product_id, quantity);
    }

    pub fn record_clear(&mut self) {
        self.expected.clear();
    }

    /// Replace the expectation with authoritative state, e.g. after the
    /// server merged a guest cart into an account cart.
    pub fn adopt(&mut self, observed: &CartSnapshot) {
        let mut expected = CartSnapshot::new();
        expected.merge(observed);
        self.expected = expected;
    }

    /// Normalize freshly read rows and check their arithmetic.
    ///
    /// Each row must satisfy `lineTotal == round(unitPrice * quantity)`; the
    /// displayed grand total, when the page shows one, must equal the sum of
    /// line totals.
    pub fn observe(&self, rows: &[ObservedRow], displayed_total: Option<&str>) -> Result<CartSnapshot> {
        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            let unit_price = normalize_amount(&row.unit_price)?;
            let quantity = normalize_quantity(&row.quantity)?;
            let line_total = normalize_amount(&row.line_total)?;

            let expected = round_price(unit_price * Decimal::from(quantity), self.precision);
            self.compare(
                Scope::Line {
                    product_id: row.product_id,
                    name: row.name.clone(),
                },
                expected,
                line_total,
            )?;

            lines.push(CartLine {
                product_id: row.product_id,
                name: row.name.clone(),
                unit_price,
                quantity,
                line_total,
            });
        }

        let sum: Decimal = lines.iter().map(|l| l.line_total).sum();
        let total = match displayed_total {
            Some(raw) => {
                let shown = normalize_amount(raw)?;
                self.compare(Scope::GrandTotal, sum, shown)?;
                shown
            }
            None => sum,
        };

        debug!(rows = lines.len(), %total, "cart rows consistent");
        Ok(CartSnapshot::from_observed(lines, total))
    }

    /// Compare an observed cart to the independently computed expectation
    pub fn verify_expected(&self, observed: &CartSnapshot) -> Result<()> {
        self.compare(
            Scope::RowCount,
            Decimal::from(self.expected.len()),
            Decimal::from(observed.len()),
        )?;

        for want in self.expected.lines() {
            let got = observed.line(want.product_id);
            self.compare(
                Scope::Quantity {
                    product_id: want.product_id,
                },
                Decimal::from(want.quantity),
                Decimal::from(got.map(|l| l.quantity).unwrap_or(0)),
            )?;
            if let Some(got) = got {
                self.compare(
                    Scope::UnitPrice {
                        product_id: want.product_id,
                    },
                    want.unit_price,
                    got.unit_price,
                )?;
            }
        }

        self.compare(
            Scope::GrandTotal,
            round_price(self.expected.total(), self.precision),
            observed.total(),
        )
    }

    /// Verify that adding `added` of an already-present product merged into
    /// its line instead of appending a new one.
    pub fn verify_merge(
        &self,
        before: &CartSnapshot,
        after: &CartSnapshot,
        product_id: u32,
        added: u32,
    ) -> Result<()> {
        let expected_rows = if before.line(product_id).is_some() {
            before.len()
        } else {
            before.len() + 1
        };
        self.compare(
            Scope::RowCount,
            Decimal::from(expected_rows),
            Decimal::from(after.len()),
        )?;
        self.compare(
            Scope::Quantity { product_id },
            Decimal::from(before.quantity_of(product_id) + added),
            Decimal::from(after.quantity_of(product_id)),
        )
    }

    /// Verify that every guest line survived login, at no less than its guest
    /// quantity. The account may already have held some of the same products.
    pub fn verify_guest_merge(&self, guest: &CartSnapshot, after: &CartSnapshot) -> Result<()> {
        for line in guest.lines() {
            let kept = after.quantity_of(line.product_id);
            if kept < line.quantity {
                return Err(Error::PriceInconsistency {
                    scope: Scope::Quantity {
                        product_id: line.product_id,
                    },
                    expected: Decimal::from(line.quantity),
                    observed: Decimal::from(kept),
                });
            }
        }
        Ok(())
    }

    fn compare(&self, scope: Scope, expected: Decimal, observed: Decimal) -> Result<()> {
        if money::within(expected, observed, self.epsilon) {
            Ok(())
        } else {
            Err(Error::PriceInconsistency {
                scope,
                expected,
                observed,
            })
        }
    }
}
