//! Contact form

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{PageContext, PageKind, PageObject};
use crate::error::E2eResult;

pub mod sel {
    pub const FORM: &str = "#contact-us-form";
    pub const NAME: &str = "input[data-qa='name']";
    pub const EMAIL: &str = "input[data-qa='email']";
    pub const SUBJECT: &str = "input[data-qa='subject']";
    pub const MESSAGE: &str = "textarea[data-qa='message']";
    pub const SUBMIT: &str = "input[data-qa='submit-button']";
    pub const SUCCESS: &str = ".status.alert-success";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactMessage {
    pub fn new(name: &str, email: &str, subject: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            subject: subject.to_string(),
            message: message.to_string(),
        }
    }
}

pub struct ContactPage<'s> {
    ctx: PageContext<'s>,
}

#[async_trait]
impl<'s> PageObject<'s> for ContactPage<'s> {
    const KIND: PageKind = PageKind::Contact;
    const LANDMARK: &'static str = sel::FORM;

    async fn from_context(ctx: PageContext<'s>) -> E2eResult<Self> {
        Ok(Self { ctx })
    }
}

impl<'s> ContactPage<'s> {
    /// Fill and submit the form, then wait for the success status.
    ///
    /// The site asks for confirmation in a browser dialog; drivers accept it.
    /// Returns the status text.
    pub async fn submit(&self, message: &ContactMessage) -> E2eResult<String> {
        self.ctx.fill(sel::NAME, &message.name).await?;
        self.ctx.fill(sel::EMAIL, &message.email).await?;
        self.ctx.fill(sel::SUBJECT, &message.subject).await?;
        self.ctx.fill(sel::MESSAGE, &message.message).await?;
        self.ctx.click(sel::SUBMIT).await?;

        self.ctx.expect_visible(sel::SUCCESS).await?;
        let status = self.ctx.text(sel::SUCCESS).await?;
        info!("[{}] contact form: {}", self.ctx.session().label(), status);
        Ok(status)
    }
}
