//! Signup, account creation, and account deletion

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{login, PageContext, PageKind, PageObject};
use crate::error::E2eResult;
use crate::session::Session;

pub mod sel {
    pub const SIGNUP_FORM: &str = "form[action='/signup']";
    pub const NAME: &str = "input[data-qa='signup-name']";
    pub const EMAIL: &str = "input[data-qa='signup-email']";
    pub const SUBMIT: &str = "button[data-qa='signup-button']";
    pub const EMAIL_TAKEN: &str = "p:has-text('Email Address already exist!')";

    pub const ACCOUNT_FORM: &str = "b:has-text('Enter Account Information')";
    pub const TITLE_MR: &str = "#id_gender1";
    pub const PASSWORD: &str = "input[data-qa='password']";
    pub const FIRST_NAME: &str = "input[data-qa='first_name']";
    pub const LAST_NAME: &str = "input[data-qa='last_name']";
    pub const ADDRESS: &str = "input[data-qa='address']";
    pub const STATE: &str = "input[data-qa='state']";
    pub const CITY: &str = "input[data-qa='city']";
    pub const ZIPCODE: &str = "input[data-qa='zipcode']";
    pub const MOBILE: &str = "input[data-qa='mobile_number']";
    pub const CREATE: &str = "button[data-qa='create-account']";

    pub const ACCOUNT_CREATED: &str = "[data-qa='account-created']";
    pub const CONTINUE: &str = "a[data-qa='continue-button']";
    pub const DELETE_ACCOUNT: &str = "a[href='/delete_account']";
    pub const ACCOUNT_DELETED: &str = "[data-qa='account-deleted']";
}

/// Everything the account form asks for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDetails {
    pub name: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub state: String,
    pub city: String,
    pub zipcode: String,
    pub mobile: String,
}

impl AccountDetails {
    pub fn new(name: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            first_name: "QA".to_string(),
            last_name: "Automation".to_string(),
            address: "Test Street 123".to_string(),
            state: "Sofia".to_string(),
            city: "Sofia".to_string(),
            zipcode: "1000".to_string(),
            mobile: "0888123456".to_string(),
        }
    }

    /// A fresh address nobody else uses, so concurrent scenarios never share
    /// a server-side cart
    pub fn unique(prefix: &str) -> Self {
        let tag = Uuid::new_v4().simple().to_string();
        let email = format!("{}+{}@shopcheck.test", prefix, &tag[..12]);
        Self::new(format!("{} {}", prefix, &tag[..6]), email, "Valid123!")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RegistrationOutcome {
    Created { email: String },
    EmailTaken { message: String },
    /// The session was already logged in; nothing was submitted
    AlreadyAuthenticated,
}

pub struct RegistrationPage<'s> {
    ctx: PageContext<'s>,
}

#[async_trait]
impl<'s> PageObject<'s> for RegistrationPage<'s> {
    const KIND: PageKind = PageKind::Registration;
    const LANDMARK: &'static str = sel::SIGNUP_FORM;

    async fn from_context(ctx: PageContext<'s>) -> E2eResult<Self> {
        Ok(Self { ctx })
    }
}

impl<'s> RegistrationPage<'s> {
    pub async fn register(&self, details: &AccountDetails) -> E2eResult<RegistrationOutcome> {
        let session = self.ctx.session();
        if session.is_authenticated() && login::is_logged_in(session).await? {
            return Ok(RegistrationOutcome::AlreadyAuthenticated);
        }

        self.ctx.fill(sel::NAME, &details.name).await?;
        self.ctx.fill(sel::EMAIL, &details.email).await?;
        self.ctx.click(sel::SUBMIT).await?;

        if self.ctx.expect_any(&[sel::ACCOUNT_FORM, sel::EMAIL_TAKEN]).await? == 1 {
            let message = self.ctx.text(sel::EMAIL_TAKEN).await?;
            info!("[{}] signup rejected for '{}': {}", session.label(), details.email, message);
            return Ok(RegistrationOutcome::EmailTaken { message });
        }

        self.ctx.click_if_present(sel::TITLE_MR).await?;
        for (selector, value) in [
            (sel::PASSWORD, &details.password),
            (sel::FIRST_NAME, &details.first_name),
            (sel::LAST_NAME, &details.last_name),
            (sel::ADDRESS, &details.address),
            (sel::STATE, &details.state),
            (sel::CITY, &details.city),
            (sel::ZIPCODE, &details.zipcode),
            (sel::MOBILE, &details.mobile),
        ] {
            self.ctx.fill(selector, value).await?;
        }
        self.ctx.click(sel::CREATE).await?;

        self.ctx.expect_visible(sel::ACCOUNT_CREATED).await?;
        self.ctx.click(sel::CONTINUE).await?;
        self.ctx.expect_visible(login::sel::LOGGED_IN).await?;

        session.set_authenticated(true);
        info!("[{}] registered '{}'", session.label(), details.email);
        Ok(RegistrationOutcome::Created {
            email: details.email.clone(),
        })
    }

    /// Delete the logged-in account. `false` when no account is logged in.
    pub async fn delete_account(session: &'s Session) -> E2eResult<bool> {
        if !session.driver().is_visible(sel::DELETE_ACCOUNT).await? {
            return Ok(false);
        }
        super::click_anywhere(session, sel::DELETE_ACCOUNT).await?;
        let ctx = PageContext::attach(session, PageKind::Registration, sel::ACCOUNT_DELETED).await?;
        ctx.click_if_present(sel::CONTINUE).await?;
        session.set_authenticated(false);
        info!("[{}] account deleted", session.label());
        Ok(true)
    }
}
