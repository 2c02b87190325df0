//! ShopCheck Common Library
//!
//! Browser-free pieces of the checkout verification harness: the error
//! taxonomy, price normalization, the cart model, the cart oracle, and the
//! checkout state machine. Nothing here touches a page.

pub mod cart;
pub mod checkout;
pub mod error;
pub mod money;
pub mod oracle;

// Re-export commonly used types
pub use cart::{CartLine, CartSnapshot, ObservedRow, ProductRef};
pub use checkout::{CheckoutMachine, CheckoutState};
pub use error::{Error, ErrorKind, Failure, Result, Scope};
pub use money::{normalize_amount, normalize_quantity};
pub use oracle::CartOracle;

/// ShopCheck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
