//! Route handlers for the HTTP API.

pub mod health;
pub mod metrics;
pub mod stream;
pub mod token;
