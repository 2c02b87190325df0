//! Declarative YAML scenarios

use serde::{Deserialize, Serialize};
use shopcheck_common::{CheckoutState, ErrorKind};
use std::path::Path;

use crate::error::{E2eError, E2eResult};

/// A complete scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Tags for filtering
    #[serde(default)]
    pub tags: Vec<String>,

    /// Which account login and registration steps use
    #[serde(default)]
    pub account: AccountMode,

    /// Steps to execute in order
    pub steps: Vec<ScenarioStep>,
}

/// Shared fixture accounts are a hazard when scenarios run concurrently;
/// `unique` gives the scenario an address nobody else uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountMode {
    #[default]
    Fixture,
    Unique,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioStep {
    #[serde(flatten)]
    pub action: Action,

    /// The step passes only if it fails with this kind
    #[serde(default)]
    pub expect_error: Option<ErrorKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    OpenCart,

    AddProduct {
        product_id: u32,
        #[serde(default = "default_quantity")]
        quantity: u32,
    },

    RemoveProduct {
        product_id: u32,
    },

    Search {
        term: String,
        /// Products that must be among the results
        #[serde(default)]
        expect_products: Vec<u32>,
        #[serde(default)]
        expect_empty: Option<bool>,
    },

    /// Log in; credentials default to the scenario's account
    Login {
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        password: Option<String>,
        /// Omitted: the outcome is reported, not asserted
        #[serde(default)]
        expect: Option<LoginExpectation>,
    },

    Register,

    DeleteAccount,

    Logout,

    Proceed,

    Confirm {
        #[serde(default)]
        comment: Option<String>,
    },

    Pay {
        #[serde(default)]
        card_number: Option<String>,
        #[serde(default)]
        expect: Option<PaymentExpectation>,
    },

    RetryPayment,

    Review {
        product_id: u32,
        text: String,
    },

    /// Send the contact form as the scenario's account
    Contact {
        subject: String,
        message: String,
    },

    ExpectState {
        state: CheckoutState,
    },

    /// Fresh read of the cart compared line by line
    ExpectCart {
        lines: Vec<ExpectedLine>,
        #[serde(default)]
        total: Option<String>,
    },

    ExpectLoggedIn {
        value: bool,
    },

    Log {
        message: String,
    },
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginExpectation {
    Authenticated,
    Rejected,
    Stayed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentExpectation {
    Placed,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedLine {
    pub product_id: u32,
    pub quantity: u32,
    /// Displayed text form, e.g. `"1000.00"` or `"Rs. 1000"`
    #[serde(default)]
    pub line_total: Option<String>,
}

impl Action {
    /// Short label for reports
    pub fn label(&self) -> String {
        match self {
            Action::OpenCart => "open_cart".to_string(),
            Action::AddProduct { product_id, quantity } => format!("add_product:{}x{}", product_id, quantity),
            Action::RemoveProduct { product_id } => format!("remove_product:{}", product_id),
            Action::Search { term, .. } => format!("search:{}", term),
            Action::Login { email, .. } => format!("login:{}", email.as_deref().unwrap_or("<account>")),
            Action::Register => "register".to_string(),
            Action::DeleteAccount => "delete_account".to_string(),
            Action::Logout => "logout".to_string(),
            Action::Proceed => "proceed".to_string(),
            Action::Confirm { .. } => "confirm".to_string(),
            Action::Pay { .. } => "pay".to_string(),
            Action::RetryPayment => "retry_payment".to_string(),
            Action::Review { product_id, .. } => format!("review:{}", product_id),
            Action::Contact { subject, .. } => format!("contact:{}", subject),
            Action::ExpectState { state } => format!("expect_state:{}", state),
            Action::ExpectCart { lines, .. } => format!("expect_cart:{} line(s)", lines.len()),
            Action::ExpectLoggedIn { value } => format!("expect_logged_in:{}", value),
            Action::Log { message } => format!("log:{}", message.chars().take(30).collect::<String>()),
        }
    }
}

impl Scenario {
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::ScenarioParse(format!("{}: {}", path.display(), e)))
    }

    /// Load every `.yaml`/`.yml` scenario under `dir`, sorted by path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        paths.sort();

        paths.iter().map(|p| Self::from_file(p)).collect()
    }

    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }
}
