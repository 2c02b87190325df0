//! Payment page

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{PageContext, PageKind, PageObject};
use crate::error::E2eResult;

pub mod sel {
    pub const FORM: &str = "form#payment-form";
    pub const NAME_ON_CARD: &str = "input[data-qa='name-on-card']";
    pub const CARD_NUMBER: &str = "input[data-qa='card-number']";
    pub const CVC: &str = "input[data-qa='cvc']";
    pub const EXPIRY_MONTH: &str = "input[data-qa='expiry-month']";
    pub const EXPIRY_YEAR: &str = "input[data-qa='expiry-year']";
    pub const PAY: &str = "button[data-qa='pay-button']";
    pub const ORDER_PLACED: &str = "[data-qa='order-placed']";
    /// Decline messages, most specific first
    pub const ERRORS: &[&str] = &["[data-qa='payment-error']", ".alert-danger"];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub name_on_card: String,
    pub card_number: String,
    pub cvc: String,
    pub expiry_month: String,
    pub expiry_year: String,
}

impl Default for PaymentDetails {
    fn default() -> Self {
        Self {
            name_on_card: "QA Automation".to_string(),
            card_number: "4242424242424242".to_string(),
            cvc: "123".to_string(),
            expiry_month: "12".to_string(),
            expiry_year: "2030".to_string(),
        }
    }
}

impl PaymentDetails {
    pub fn with_card(card_number: impl Into<String>) -> Self {
        Self {
            card_number: card_number.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PaymentOutcome {
    Placed,
    Declined { message: String },
}

pub struct PaymentPage<'s> {
    ctx: PageContext<'s>,
}

#[async_trait]
impl<'s> PageObject<'s> for PaymentPage<'s> {
    const KIND: PageKind = PageKind::Payment;
    const LANDMARK: &'static str = sel::FORM;

    async fn from_context(ctx: PageContext<'s>) -> E2eResult<Self> {
        Ok(Self { ctx })
    }
}

impl<'s> PaymentPage<'s> {
    pub async fn pay(&self, details: &PaymentDetails) -> E2eResult<PaymentOutcome> {
        self.ctx.fill(sel::NAME_ON_CARD, &details.name_on_card).await?;
        self.ctx.fill(sel::CARD_NUMBER, &details.card_number).await?;
        self.ctx.fill(sel::CVC, &details.cvc).await?;
        self.ctx.fill(sel::EXPIRY_MONTH, &details.expiry_month).await?;
        self.ctx.fill(sel::EXPIRY_YEAR, &details.expiry_year).await?;
        self.ctx.click(sel::PAY).await?;

        let mut landmarks = vec![sel::ORDER_PLACED];
        landmarks.extend_from_slice(sel::ERRORS);
        let outcome = match self.ctx.expect_any(&landmarks).await? {
            0 => PaymentOutcome::Placed,
            i => PaymentOutcome::Declined {
                message: self.ctx.text(landmarks[i]).await?,
            },
        };
        info!("[{}] payment: {:?}", self.ctx.session().label(), outcome);
        Ok(outcome)
    }
}
