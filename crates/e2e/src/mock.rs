//! In-memory storefront
//!
//! [`MockStore`] holds the server side: catalog, accounts, and each account's
//! cart. Every [`MockTab`] is one browser page with its own guest cart and
//! login state, so two tabs logged into the same account share one cart the
//! way two real browser contexts would.
//!
//! Pages are rendered as flat lists of `(selector, element)` pairs and
//! matched by exact selector string, using the same selector constants the
//! page objects use. Obstructions, and the modals the site opens, intercept
//! clicks until they are cleared.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use rust_decimal::Decimal;
use shopcheck_common::ProductRef;
use tracing::debug;

use crate::driver::{Column, PageDriver, Row};
use crate::error::{E2eError, E2eResult};
use crate::overlay::{default_signatures, ObstructionSignature};
use crate::pages::{cart, checkout, contact, login, parse_product_id, payment, products, registration};
use crate::runner::SessionFactory;
use crate::session::{Session, Timeouts};

pub const MOCK_BASE_URL: &str = "http://shop.mock";

/// Browser-side email validation; a failing value never submits the form
static EMAIL_INPUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$")
        .expect("static regex")
});

/// How an obstruction reacts to the guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstructionBehavior {
    /// Its dismiss control works
    Dismissible,
    /// The control is shown but does nothing; detaching works
    DismissFails,
    /// No control; detaching works
    DetachOnly,
    /// Nothing clears it
    Sticky,
}

#[derive(Debug, Clone)]
pub struct MockObstruction {
    pub signature: ObstructionSignature,
    pub behavior: ObstructionBehavior,
    /// Navigations that still show it; `None` shows it on every navigation
    pub remaining: Option<u32>,
}

impl MockObstruction {
    pub fn new(signature: ObstructionSignature, behavior: ObstructionBehavior) -> Self {
        Self {
            signature,
            behavior,
            remaining: None,
        }
    }

    /// One of the guard's default signatures, by name
    pub fn named(name: &str, behavior: ObstructionBehavior) -> Option<Self> {
        default_signatures()
            .into_iter()
            .find(|s| s.name == name)
            .map(|s| Self::new(s, behavior))
    }

    pub fn times(mut self, navigations: u32) -> Self {
        self.remaining = Some(navigations);
        self
    }

    fn shows_controls(&self) -> bool {
        self.behavior != ObstructionBehavior::DetachOnly
    }
}

/// Deliberate site bugs for exercising the oracle
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Re-adding a product appends a row instead of merging
    pub duplicate_rows: bool,
    /// Added to every displayed line total
    pub line_total_skew: Decimal,
    /// Added to the checkout "Total Amount"
    pub grand_total_skew: Decimal,
    /// Logging in discards the guest cart instead of merging it
    pub drop_guest_cart: bool,
}

#[derive(Debug, Clone)]
struct Account {
    name: String,
    password: String,
    cart: Vec<(u32, u32)>,
}

#[derive(Debug)]
struct StoreState {
    catalog: Vec<ProductRef>,
    accounts: HashMap<String, Account>,
    obstructions: Vec<MockObstruction>,
    faults: Faults,
    declined_cards: Vec<String>,
    orders: u32,
}

/// Server side of the mock storefront; cheap to clone
#[derive(Clone)]
pub struct MockStore {
    state: Arc<Mutex<StoreState>>,
    timeouts: Timeouts,
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    /// Six products, one account (`valid@user.com` / `Valid123!`), card
    /// `0000000000000000` declined
    pub fn new() -> Self {
        let catalog = vec![
            ProductRef::new(1, "Blue Top", Decimal::from(500)),
            ProductRef::new(2, "Men Tshirt", Decimal::from(400)),
            ProductRef::new(3, "Sleeveless Dress", Decimal::from(1000)),
            ProductRef::new(4, "Stylish Dress", Decimal::from(1500)),
            ProductRef::new(5, "Winter Top", Decimal::from(600)),
            ProductRef::new(6, "Summer White Top", Decimal::from(400)),
        ];
        let store = Self {
            state: Arc::new(Mutex::new(StoreState {
                catalog,
                accounts: HashMap::new(),
                obstructions: Vec::new(),
                faults: Faults::default(),
                declined_cards: vec!["0000000000000000".to_string()],
                orders: 0,
            })),
            timeouts: Timeouts {
                landmark: Duration::from_millis(300),
                dismiss: Duration::from_millis(100),
                poll_interval: Duration::from_millis(5),
                retry_backoff: Duration::from_millis(10),
                navigation: Duration::from_secs(1),
            },
        };
        store.with_account("valid@user.com", "Valid123!", "QA Tester")
    }

    pub fn with_account(self, email: &str, password: &str, name: &str) -> Self {
        self.state.lock().accounts.insert(
            email.to_string(),
            Account {
                name: name.to_string(),
                password: password.to_string(),
                cart: Vec::new(),
            },
        );
        self
    }

    pub fn with_product(self, product: ProductRef) -> Self {
        {
            let mut st = self.state.lock();
            st.catalog.retain(|p| p.id != product.id);
            st.catalog.push(product);
        }
        self
    }

    pub fn with_obstruction(self, obstruction: MockObstruction) -> Self {
        self.add_obstruction(obstruction);
        self
    }

    /// Script an obstruction for the next navigations of every tab
    pub fn add_obstruction(&self, obstruction: MockObstruction) {
        self.state.lock().obstructions.push(obstruction);
    }

    pub fn with_faults(self, faults: Faults) -> Self {
        self.state.lock().faults = faults;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub fn open_tab(&self) -> MockTab {
        MockTab {
            store: self.clone(),
            tab: Mutex::new(TabState::default()),
        }
    }

    /// A session on a fresh tab of this store
    pub fn session(&self, label: &str) -> Session {
        Session::new(Arc::new(self.open_tab()), MOCK_BASE_URL)
            .with_timeouts(self.timeouts)
            .with_label(label)
    }

    /// Server-side cart of an account as `(product_id, quantity)`
    pub fn account_cart(&self, email: &str) -> Vec<(u32, u32)> {
        self.state
            .lock()
            .accounts
            .get(email)
            .map(|a| a.cart.clone())
            .unwrap_or_default()
    }

    pub fn has_account(&self, email: &str) -> bool {
        self.state.lock().accounts.contains_key(email)
    }

    pub fn account_count(&self) -> usize {
        self.state.lock().accounts.len()
    }

    pub fn orders_placed(&self) -> u32 {
        self.state.lock().orders
    }
}

#[async_trait]
impl SessionFactory for MockStore {
    async fn create(&self, label: &str) -> E2eResult<Session> {
        Ok(self.session(label))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modal {
    CartAdded,
    CheckoutPrompt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flash {
    LoginError,
    EmailTaken,
    PaymentDeclined,
    ReviewThanks,
    ContactSent,
}

#[derive(Debug, Default)]
struct TabState {
    route: String,
    user: Option<String>,
    guest_cart: Vec<(u32, u32)>,
    inputs: HashMap<String, String>,
    modal: Option<Modal>,
    flash: Option<Flash>,
    search: Option<String>,
    pending_signup: Option<(String, String)>,
    obstructions: Vec<MockObstruction>,
    removed: HashSet<String>,
}

#[derive(Debug, Clone)]
struct Element {
    text: String,
    visible: bool,
}

/// One browser page on a [`MockStore`]
pub struct MockTab {
    store: MockStore,
    tab: Mutex<TabState>,
}

impl MockTab {
    fn rendered(&self, selector: &str) -> Vec<Element> {
        let tab = self.tab.lock();
        let st = self.store.state.lock();
        render(&tab, &st)
            .into_iter()
            .filter(|(sel, _)| sel == selector)
            .map(|(_, el)| el)
            .collect()
    }

    fn first_visible(&self, selector: &str) -> E2eResult<Element> {
        self.rendered(selector)
            .into_iter()
            .find(|el| el.visible)
            .ok_or_else(|| E2eError::driver(selector, "no visible element"))
    }
}

#[async_trait]
impl PageDriver for MockTab {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        let route = route_of(url);
        let mut tab = self.tab.lock();
        let mut st = self.store.state.lock();
        navigate(&mut tab, &mut st, &route);
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        Ok(format!("{}{}", MOCK_BASE_URL, self.tab.lock().route))
    }

    async fn count(&self, selector: &str) -> E2eResult<usize> {
        let rows = {
            let tab = self.tab.lock();
            let st = self.store.state.lock();
            table_rows(&tab, &st, selector).len()
        };
        Ok(self.rendered(selector).len() + rows)
    }

    async fn is_visible(&self, selector: &str) -> E2eResult<bool> {
        Ok(self.rendered(selector).first().map(|el| el.visible).unwrap_or(false))
    }

    async fn fill(&self, selector: &str, value: &str) -> E2eResult<()> {
        self.first_visible(selector)?;
        let mut tab = self.tab.lock();
        intercepted(&tab, selector)?;
        tab.inputs.insert(selector.to_string(), value.to_string());
        Ok(())
    }

    async fn click(&self, selector: &str) -> E2eResult<()> {
        self.first_visible(selector)?;
        let mut tab = self.tab.lock();
        let mut st = self.store.state.lock();

        if let Some(i) = tab
            .obstructions
            .iter()
            .position(|o| o.shows_controls() && o.signature.dismiss.iter().any(|d| d == selector))
        {
            if tab.obstructions[i].behavior == ObstructionBehavior::Dismissible {
                let gone = tab.obstructions.remove(i);
                debug!("mock: {} dismissed", gone.signature.name);
            }
            return Ok(());
        }
        intercepted(&tab, selector)?;
        dispatch_click(&mut tab, &mut st, selector);
        Ok(())
    }

    async fn text(&self, selector: &str) -> E2eResult<String> {
        Ok(self.first_visible(selector)?.text.trim().to_string())
    }

    async fn input_value(&self, selector: &str) -> E2eResult<String> {
        self.first_visible(selector)?;
        Ok(self.tab.lock().inputs.get(selector).cloned().unwrap_or_default())
    }

    async fn remove(&self, selector: &str) -> E2eResult<usize> {
        let mut tab = self.tab.lock();
        if tab.obstructions.iter().any(|o| o.signature.root == selector) {
            let before = tab.obstructions.len();
            tab.obstructions
                .retain(|o| o.signature.root != selector || o.behavior == ObstructionBehavior::Sticky);
            return Ok(before - tab.obstructions.len());
        }

        let st = self.store.state.lock();
        let matched = render(&tab, &st).iter().filter(|(sel, _)| sel == selector).count();
        drop(st);
        if matched > 0 {
            tab.removed.insert(selector.to_string());
        }
        Ok(matched)
    }

    async fn query_all(&self, row_selector: &str, columns: &[Column]) -> E2eResult<Vec<Row>> {
        let tab = self.tab.lock();
        let st = self.store.state.lock();
        let rows = table_rows(&tab, &st, row_selector);
        Ok(rows
            .into_iter()
            .map(|cells| {
                columns
                    .iter()
                    .filter_map(|col| {
                        cells
                            .iter()
                            .find(|(sel, attr, _)| *sel == col.selector && *attr == col.attribute)
                            .map(|(_, _, value)| (col.name.to_string(), value.clone()))
                    })
                    .collect()
            })
            .collect())
    }
}

fn route_of(url: &str) -> String {
    let rest = match url.find("://") {
        Some(i) => &url[i + 3..],
        None => return format!("/{}", url.trim_start_matches('/')),
    };
    match rest.find('/') {
        Some(i) => rest[i..].to_string(),
        None => "/".to_string(),
    }
}

fn price(amount: Decimal) -> String {
    format!("Rs. {}", amount)
}

fn search_term(query: &str) -> Option<String> {
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("search="))
        .map(|raw| raw.replace('+', " ").replace("%20", " "))
}

fn navigate(tab: &mut TabState, st: &mut StoreState, route: &str) {
    let (path, query) = route.split_once('?').unwrap_or((route, ""));
    let route = if path == "/checkout" && tab.user.is_none() {
        "/login".to_string()
    } else {
        route.to_string()
    };

    tab.search = if path == "/products" { search_term(query) } else { None };
    tab.route = route;
    tab.inputs.clear();
    tab.modal = None;
    tab.flash = None;
    tab.removed.clear();
    tab.obstructions = st
        .obstructions
        .iter_mut()
        .filter_map(|o| match o.remaining {
            None => Some(o.clone()),
            Some(0) => None,
            Some(n) => {
                o.remaining = Some(n - 1);
                Some(o.clone())
            }
        })
        .collect();
}

/// The modal or obstruction in front of `selector`, if any
fn intercepted(tab: &TabState, selector: &str) -> E2eResult<()> {
    if let Some(o) = tab.obstructions.first() {
        return Err(E2eError::driver(
            selector,
            format!("click intercepted by {}", o.signature.name),
        ));
    }
    let allowed: &[&str] = match tab.modal {
        Some(Modal::CartAdded) => &[products::sel::CONTINUE_SHOPPING],
        Some(Modal::CheckoutPrompt) => &[cart::sel::MODAL_LOGIN],
        None => return Ok(()),
    };
    if allowed.contains(&selector) {
        Ok(())
    } else {
        Err(E2eError::driver(selector, "click intercepted by open modal"))
    }
}

fn cart_mut<'a>(tab: &'a mut TabState, st: &'a mut StoreState) -> &'a mut Vec<(u32, u32)> {
    match tab.user.as_ref().and_then(|u| st.accounts.get_mut(u)) {
        Some(account) => &mut account.cart,
        None => &mut tab.guest_cart,
    }
}

fn cart_lines(tab: &TabState, st: &StoreState) -> Vec<(u32, u32)> {
    match tab.user.as_ref().and_then(|u| st.accounts.get(u)) {
        Some(account) => account.cart.clone(),
        None => tab.guest_cart.clone(),
    }
}

fn add_line(lines: &mut Vec<(u32, u32)>, product_id: u32, quantity: u32, duplicate: bool) {
    match lines.iter_mut().find(|(id, _)| *id == product_id) {
        Some((_, qty)) if !duplicate => *qty += quantity,
        _ => lines.push((product_id, quantity)),
    }
}

fn merge_guest_cart(tab: &mut TabState, st: &mut StoreState) {
    let guest = std::mem::take(&mut tab.guest_cart);
    if st.faults.drop_guest_cart {
        debug!("mock: dropped {} guest lines on login", guest.len());
        return;
    }
    let duplicate = st.faults.duplicate_rows;
    let cart = cart_mut(tab, st);
    for (id, qty) in guest {
        add_line(cart, id, qty, duplicate);
    }
}

fn input(tab: &TabState, selector: &str) -> String {
    tab.inputs.get(selector).cloned().unwrap_or_default()
}

fn dispatch_click(tab: &mut TabState, st: &mut StoreState, selector: &str) {
    match selector {
        products::sel::CONTINUE_SHOPPING => tab.modal = None,
        cart::sel::MODAL_LOGIN => navigate(tab, st, "/login"),
        login::sel::SUBMIT => submit_login(tab, st),
        login::sel::LOGOUT => {
            tab.user = None;
            navigate(tab, st, "/login");
        }
        registration::sel::DELETE_ACCOUNT => {
            if let Some(user) = tab.user.take() {
                st.accounts.remove(&user);
            }
            navigate(tab, st, "/delete_account");
        }
        registration::sel::SUBMIT => submit_signup(tab, st),
        registration::sel::CREATE => create_account(tab, st),
        registration::sel::CONTINUE => navigate(tab, st, "/"),
        products::sel::SEARCH_SUBMIT => {
            let term = input(tab, products::sel::SEARCH_INPUT);
            navigate(tab, st, &format!("/products?search={}", term.replace(' ', "+")));
        }
        products::sel::ADD_FROM_DETAILS => {
            let quantity = input(tab, products::sel::QUANTITY).trim().parse::<u32>().unwrap_or(1).max(1);
            if let Some(id) = parse_product_id(&tab.route) {
                add_to_cart(tab, st, id, quantity);
            }
        }
        products::sel::REVIEW_SUBMIT => {
            let complete = [
                products::sel::REVIEW_NAME,
                products::sel::REVIEW_EMAIL,
                products::sel::REVIEW_TEXT,
            ]
            .iter()
            .all(|sel| !input(tab, sel).trim().is_empty());
            if complete {
                tab.flash = Some(Flash::ReviewThanks);
            }
        }
        contact::sel::SUBMIT => {
            let email = input(tab, contact::sel::EMAIL);
            let complete = [contact::sel::NAME, contact::sel::MESSAGE]
                .iter()
                .all(|sel| !input(tab, sel).trim().is_empty());
            if complete && EMAIL_INPUT.is_match(email.trim()) {
                tab.flash = Some(Flash::ContactSent);
            }
        }
        cart::sel::PROCEED => {
            if tab.user.is_some() {
                navigate(tab, st, "/checkout");
            } else {
                tab.modal = Some(Modal::CheckoutPrompt);
            }
        }
        checkout::sel::PLACE_ORDER => navigate(tab, st, "/payment"),
        payment::sel::PAY => submit_payment(tab, st),
        other if other.starts_with(".productinfo a.add-to-cart") => {
            if let Some(id) = parse_product_id(other) {
                add_to_cart(tab, st, id, 1);
            }
        }
        other if other.starts_with("a.cart_quantity_delete") => {
            if let Some(id) = parse_product_id(other) {
                cart_mut(tab, st).retain(|(line, _)| *line != id);
            }
        }
        _ => {}
    }
}

fn add_to_cart(tab: &mut TabState, st: &mut StoreState, product_id: u32, quantity: u32) {
    if !st.catalog.iter().any(|p| p.id == product_id) {
        return;
    }
    let duplicate = st.faults.duplicate_rows;
    add_line(cart_mut(tab, st), product_id, quantity, duplicate);
    tab.modal = Some(Modal::CartAdded);
}

fn submit_login(tab: &mut TabState, st: &mut StoreState) {
    tab.flash = None;
    let email = input(tab, login::sel::EMAIL).trim().to_string();
    let password = input(tab, login::sel::PASSWORD);
    if email.is_empty() || password.is_empty() || !EMAIL_INPUT.is_match(&email) {
        return;
    }

    let valid = st
        .accounts
        .get(&email)
        .map(|a| a.password == password)
        .unwrap_or(false);
    if !valid {
        tab.flash = Some(Flash::LoginError);
        return;
    }
    tab.user = Some(email);
    merge_guest_cart(tab, st);
    navigate(tab, st, "/");
}

fn submit_signup(tab: &mut TabState, st: &mut StoreState) {
    tab.flash = None;
    let name = input(tab, registration::sel::NAME).trim().to_string();
    let email = input(tab, registration::sel::EMAIL).trim().to_string();
    if name.is_empty() || !EMAIL_INPUT.is_match(&email) {
        return;
    }
    if st.accounts.contains_key(&email) {
        tab.flash = Some(Flash::EmailTaken);
        return;
    }
    tab.pending_signup = Some((name, email));
    navigate(tab, st, "/signup");
}

fn create_account(tab: &mut TabState, st: &mut StoreState) {
    let password = input(tab, registration::sel::PASSWORD);
    if password.is_empty() {
        return;
    }
    let Some((name, email)) = tab.pending_signup.take() else {
        return;
    };
    st.accounts.insert(
        email.clone(),
        Account {
            name,
            password,
            cart: Vec::new(),
        },
    );
    tab.user = Some(email);
    merge_guest_cart(tab, st);
    navigate(tab, st, "/account_created");
}

fn submit_payment(tab: &mut TabState, st: &mut StoreState) {
    tab.flash = None;
    let required = [
        payment::sel::NAME_ON_CARD,
        payment::sel::CARD_NUMBER,
        payment::sel::CVC,
        payment::sel::EXPIRY_MONTH,
        payment::sel::EXPIRY_YEAR,
    ];
    if required.iter().any(|sel| input(tab, sel).trim().is_empty()) {
        return;
    }
    let card = input(tab, payment::sel::CARD_NUMBER).replace(' ', "");
    if st.declined_cards.contains(&card) {
        tab.flash = Some(Flash::PaymentDeclined);
        return;
    }
    cart_mut(tab, st).clear();
    st.orders += 1;
    navigate(tab, st, "/payment_done");
}

type Cells = Vec<(Option<&'static str>, Option<&'static str>, String)>;

fn listed_products<'a>(tab: &TabState, st: &'a StoreState) -> Vec<&'a ProductRef> {
    st.catalog
        .iter()
        .filter(|p| match &tab.search {
            Some(term) => p.name.to_lowercase().contains(&term.trim().to_lowercase()),
            None => true,
        })
        .collect()
}

fn table_rows(tab: &TabState, st: &StoreState, row_selector: &str) -> Vec<Cells> {
    let path = tab.route.split('?').next().unwrap_or_default();
    match row_selector {
        products::sel::CARD if path == "/" || path == "/products" => listed_products(tab, st)
            .into_iter()
            .map(|p| {
                vec![
                    (Some(".productinfo p"), None, p.name.clone()),
                    (Some(".productinfo h2"), None, price(p.unit_price)),
                    (
                        Some(".productinfo a.add-to-cart"),
                        Some("data-product-id"),
                        p.id.to_string(),
                    ),
                ]
            })
            .collect(),
        cart::sel::ROW if path == "/view_cart" || path == "/checkout" => cart_lines(tab, st)
            .into_iter()
            .filter_map(|(id, qty)| {
                let p = st.catalog.iter().find(|p| p.id == id)?;
                let total = p.unit_price * Decimal::from(qty) + st.faults.line_total_skew;
                Some(vec![
                    (None, Some("id"), format!("product-{}", id)),
                    (Some(".cart_description h4 a"), None, p.name.clone()),
                    (Some(".cart_price p"), None, price(p.unit_price)),
                    (Some(".cart_quantity button"), None, qty.to_string()),
                    (Some(".cart_total_price"), None, price(total)),
                ])
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Flat `(selector, element)` view of the current page
fn render(tab: &TabState, st: &StoreState) -> Vec<(String, Element)> {
    let mut out: Vec<(String, Element)> = Vec::new();
    let mut el = |selector: &str, text: &str| {
        out.push((
            selector.to_string(),
            Element {
                text: text.to_string(),
                visible: true,
            },
        ));
    };

    let account = tab.user.as_ref().and_then(|u| st.accounts.get(u));
    match account {
        Some(a) => {
            el(login::sel::LOGGED_IN, &format!("Logged in as {}", a.name));
            el(login::sel::LOGOUT, "Logout");
            el(registration::sel::DELETE_ACCOUNT, "Delete Account");
        }
        None => el("a[href='/login']", "Signup / Login"),
    }

    for o in &tab.obstructions {
        el(&o.signature.root, &o.signature.name);
        if o.shows_controls() {
            for control in &o.signature.dismiss {
                el(control, "Accept");
            }
        }
    }

    match tab.modal {
        Some(Modal::CartAdded) => {
            el(products::sel::CART_MODAL, "Added! Your product has been added to cart.");
            el(products::sel::CONTINUE_SHOPPING, "Continue Shopping");
        }
        Some(Modal::CheckoutPrompt) => {
            el(cart::sel::CHECKOUT_MODAL, "Register / Login account to proceed on checkout.");
            el(cart::sel::MODAL_LOGIN, "Register / Login");
        }
        None => {}
    }

    let path = tab.route.split('?').next().unwrap_or_default();
    let lines = cart_lines(tab, st);
    match path {
        "/" | "/products" => {
            el(products::sel::LISTING, "All Products");
            if path == "/products" {
                el(products::sel::SEARCH_INPUT, "");
                el(products::sel::SEARCH_SUBMIT, "");
            }
            if tab.search.is_some() {
                el(products::sel::SEARCHED, "Searched Products");
            }
            for p in listed_products(tab, st) {
                el(&products::sel::add_button(p.id), "Add to cart");
            }
        }
        p if p.starts_with("/product_details/") => {
            if let Some(product) = parse_product_id(p).and_then(|id| st.catalog.iter().find(|x| x.id == id)) {
                el(products::sel::DETAILS, "");
                el(products::sel::DETAILS_NAME, &product.name);
                el(products::sel::DETAILS_PRICE, &price(product.unit_price));
                el(products::sel::QUANTITY, "");
                el(products::sel::ADD_FROM_DETAILS, "Add to cart");
                el(products::sel::REVIEW_NAME, "");
                el(products::sel::REVIEW_EMAIL, "");
                el(products::sel::REVIEW_TEXT, "");
                el(products::sel::REVIEW_SUBMIT, "Submit");
                if tab.flash == Some(Flash::ReviewThanks) {
                    el(products::sel::REVIEW_THANKS, "Thank you for your review.");
                }
            }
        }
        "/login" => {
            el(login::sel::FORM, "Login to your account");
            el(login::sel::EMAIL, "");
            el(login::sel::PASSWORD, "");
            el(login::sel::SUBMIT, "Login");
            if tab.flash == Some(Flash::LoginError) {
                el(login::sel::ERROR, "Your email or password is incorrect!");
            }
            el(registration::sel::SIGNUP_FORM, "New User Signup!");
            el(registration::sel::NAME, "");
            el(registration::sel::EMAIL, "");
            el(registration::sel::SUBMIT, "Signup");
            if tab.flash == Some(Flash::EmailTaken) {
                el(registration::sel::EMAIL_TAKEN, "Email Address already exist!");
            }
        }
        "/signup" => {
            el(registration::sel::ACCOUNT_FORM, "Enter Account Information");
            for sel in [
                registration::sel::TITLE_MR,
                registration::sel::PASSWORD,
                registration::sel::FIRST_NAME,
                registration::sel::LAST_NAME,
                registration::sel::ADDRESS,
                registration::sel::STATE,
                registration::sel::CITY,
                registration::sel::ZIPCODE,
                registration::sel::MOBILE,
            ] {
                el(sel, "");
            }
            el(registration::sel::CREATE, "Create Account");
        }
        "/account_created" => {
            el(registration::sel::ACCOUNT_CREATED, "Account Created!");
            el(registration::sel::CONTINUE, "Continue");
        }
        "/delete_account" => {
            el(registration::sel::ACCOUNT_DELETED, "Account Deleted!");
            el(registration::sel::CONTINUE, "Continue");
        }
        "/contact_us" => {
            el(contact::sel::FORM, "Get In Touch");
            if tab.flash == Some(Flash::ContactSent) {
                el(
                    contact::sel::SUCCESS,
                    "Success! Your details have been submitted successfully.",
                );
            } else {
                el(contact::sel::NAME, "");
                el(contact::sel::EMAIL, "");
                el(contact::sel::SUBJECT, "");
                el(contact::sel::MESSAGE, "");
                el(contact::sel::SUBMIT, "Submit");
            }
        }
        "/view_cart" => {
            el(cart::sel::CART, "Shopping Cart");
            el(cart::sel::TABLE, "");
            for (id, _) in &lines {
                el(&cart::sel::row_for(*id), "");
                el(&cart::sel::delete_button(*id), "");
            }
            if lines.is_empty() {
                el(cart::sel::EMPTY, "Cart is empty! Click here to buy products.");
            } else {
                el(cart::sel::PROCEED, "Proceed To Checkout");
            }
        }
        "/checkout" => {
            el(checkout::sel::ADDRESS_DETAILS, "Address Details");
            el(checkout::sel::REVIEW_ORDER, "Review Your Order");
            el(
                checkout::sel::DELIVERY_ADDRESS,
                account.map(|a| a.name.as_str()).unwrap_or_default(),
            );
            for (id, _) in &lines {
                el(&cart::sel::row_for(*id), "");
            }
            if lines.is_empty() {
                el(checkout::sel::EMPTY, "Cart is empty!");
            }
            let sum: Decimal = lines
                .iter()
                .filter_map(|(id, qty)| {
                    st.catalog
                        .iter()
                        .find(|p| p.id == *id)
                        .map(|p| p.unit_price * Decimal::from(*qty) + st.faults.line_total_skew)
                })
                .sum();
            el(checkout::sel::TOTAL, &price(sum + st.faults.grand_total_skew));
            el(checkout::sel::COMMENT, "");
            el(checkout::sel::PLACE_ORDER, "Place Order");
        }
        "/payment" => {
            el(payment::sel::FORM, "Payment");
            for sel in [
                payment::sel::NAME_ON_CARD,
                payment::sel::CARD_NUMBER,
                payment::sel::CVC,
                payment::sel::EXPIRY_MONTH,
                payment::sel::EXPIRY_YEAR,
            ] {
                el(sel, "");
            }
            el(payment::sel::PAY, "Pay and Confirm Order");
            if tab.flash == Some(Flash::PaymentDeclined) {
                el(payment::sel::ERRORS[0], "Your card was declined.");
            }
        }
        "/payment_done" => el(payment::sel::ORDER_PLACED, "Order Placed!"),
        _ => {}
    }

    out.retain(|(sel, _)| !tab.removed.contains(sel));
    out
}
