//! sg-core: shared errors, configuration, and stream access tokens.
//!
//! This crate is the foundational dependency for all other sg-* crates.

pub mod config;
pub mod error;
pub mod token;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use token::{AccessToken, TokenSigner};
