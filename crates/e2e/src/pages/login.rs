//! Login page and session-level auth checks

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shopcheck_common::Error;
use tracing::{debug, info};

use super::{PageContext, PageKind, PageObject};
use crate::error::{E2eError, E2eResult};
use crate::session::Session;
use crate::wait;

pub mod sel {
    pub const FORM: &str = "form[action='/login']";
    pub const EMAIL: &str = "input[data-qa='login-email']";
    pub const EMAIL_BY_NAME: &str = "form[action='/login'] input[name='email']";
    pub const PASSWORD: &str = "input[data-qa='login-password']";
    pub const PASSWORD_BY_NAME: &str = "form[action='/login'] input[name='password']";
    pub const SUBMIT: &str = "button[data-qa='login-button']";
    pub const SUBMIT_BY_TYPE: &str = "form[action='/login'] button[type='submit']";
    pub const LOGGED_IN: &str = "a:has-text('Logged in as')";
    pub const ERROR: &str = "p:has-text('Your email or password is incorrect!')";
    pub const LOGOUT: &str = "a[href='/logout']";
}

/// What the page showed after a login attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoginOutcome {
    /// "Logged in as ..." is visible
    Authenticated { user: String },
    /// The credentials error is visible
    Rejected { message: String },
    /// Neither landmark appeared; the form was not submitted (blank or
    /// malformed input blocked by the browser) or the site ignored it
    Stayed { url: String },
}

impl LoginOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, LoginOutcome::Authenticated { .. })
    }
}

pub struct LoginPage<'s> {
    ctx: PageContext<'s>,
    email: &'static str,
    password: &'static str,
    submit: &'static str,
}

#[async_trait]
impl<'s> PageObject<'s> for LoginPage<'s> {
    const KIND: PageKind = PageKind::Login;
    const LANDMARK: &'static str = sel::FORM;

    async fn from_context(ctx: PageContext<'s>) -> E2eResult<Self> {
        let email = ctx.resolve(&[sel::EMAIL, sel::EMAIL_BY_NAME]).await?;
        let password = ctx.resolve(&[sel::PASSWORD, sel::PASSWORD_BY_NAME]).await?;
        let submit = ctx.resolve(&[sel::SUBMIT, sel::SUBMIT_BY_TYPE]).await?;
        Ok(Self {
            ctx,
            email,
            password,
            submit,
        })
    }
}

impl<'s> LoginPage<'s> {
    /// Submit credentials and report what the page shows.
    ///
    /// Already logged in is reported as `Authenticated` without resubmitting.
    /// The session flag follows the observed outcome.
    pub async fn login(&self, email: &str, password: &str) -> E2eResult<LoginOutcome> {
        let session = self.ctx.session();
        if session.is_authenticated() && is_logged_in(session).await? {
            debug!("[{}] already logged in, not resubmitting", session.label());
            return Ok(LoginOutcome::Authenticated {
                user: logged_in_user(session).await?,
            });
        }

        self.ctx.fill(self.email, email).await?;
        self.ctx.fill(self.password, password).await?;
        self.ctx.click(self.submit).await?;

        let timeouts = session.timeouts();
        let seen = wait::wait_for_any(
            session.driver(),
            &[sel::LOGGED_IN, sel::ERROR],
            timeouts.landmark,
            timeouts.poll_interval,
        )
        .await;

        let outcome = match seen {
            Ok(0) => LoginOutcome::Authenticated {
                user: logged_in_user(session).await?,
            },
            Ok(_) => LoginOutcome::Rejected {
                message: self.ctx.text(sel::ERROR).await?,
            },
            Err(E2eError::Check(Error::Timeout { .. })) => LoginOutcome::Stayed {
                url: session.current_route().await?,
            },
            Err(e) => return Err(e),
        };

        session.set_authenticated(outcome.is_authenticated());
        info!("[{}] login as '{}': {:?}", session.label(), email, outcome);
        Ok(outcome)
    }

    pub async fn error_visible(&self) -> E2eResult<bool> {
        self.ctx.is_visible(sel::ERROR).await
    }

    pub async fn email_value(&self) -> E2eResult<String> {
        self.ctx.input_value(self.email).await
    }

    /// Log out from whatever page the session is on.
    ///
    /// Safe when already logged out: the session ends up on the login page
    /// either way, with the flag cleared.
    pub async fn logout(session: &'s Session) -> E2eResult<LoginPage<'s>> {
        if session.driver().is_visible(sel::LOGOUT).await? {
            super::click_anywhere(session, sel::LOGOUT).await?;
            let page = LoginPage::attach(session).await?;
            session.set_authenticated(false);
            return Ok(page);
        }
        session.set_authenticated(false);
        LoginPage::open(session).await
    }
}

/// Whether the "Logged in as" landmark is showing on the current page
pub async fn is_logged_in(session: &Session) -> E2eResult<bool> {
    session.driver().is_visible(sel::LOGGED_IN).await
}

async fn logged_in_user(session: &Session) -> E2eResult<String> {
    let text = session.driver().text(sel::LOGGED_IN).await?;
    Ok(text.trim().trim_start_matches("Logged in as").trim().to_string())
}
