//! ShopCheck E2E harness
//!
//! Drives a storefront's checkout through real browser pages and checks,
//! at every step, that what the pages show agrees with an independently
//! maintained cart model.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Scenario Runner (Rust)                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner                                             │
//! │    ├── SessionFactory::create() -> Session                  │
//! │    │     ├── PlaywrightSessions (Node bridge, JSON lines)   │
//! │    │     └── MockStore (in-memory storefront)               │
//! │    ├── CheckoutFlow                                         │
//! │    │     ├── CheckoutMachine (allowed transitions)          │
//! │    │     ├── CartOracle (expected cart, price checks)       │
//! │    │     └── page objects -> OverlayGuard -> PageDriver     │
//! │    └── write_results() -> results.json                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario (YAML)                                            │
//! │    ├── name, description, tags, account                     │
//! │    └── steps: [Step]                                        │
//! │          ├── add_product { product_id, quantity }           │
//! │          ├── proceed / login / register / confirm / pay     │
//! │          ├── expect_cart { lines, total }                   │
//! │          └── expect_error: <kind>                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod flow;
pub mod mock;
pub mod overlay;
pub mod pages;
pub mod playwright;
pub mod runner;
pub mod scenario;
pub mod session;
pub mod site;
pub mod wait;

pub use config::HarnessConfig;
pub use driver::{Column, PageDriver, Row, WaitState};
pub use error::{E2eError, E2eResult};
pub use flow::CheckoutFlow;
pub use mock::MockStore;
pub use overlay::{ObstructionSignature, OverlayGuard};
pub use runner::{RunnerConfig, ScenarioRunner, SessionFactory, SuiteResult};
pub use scenario::Scenario;
pub use session::{Session, Timeouts};
