//! HTTP middleware: request ID, stream token auth, and the token API key.

pub mod api_key;
pub mod request_id;
pub mod stream_auth;
