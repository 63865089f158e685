//! sg-hls: pure HLS helpers for the gateway.
//!
//! - [`object_key`]: stream folder normalization and traversal-proof
//!   resolution of quality selectors into object keys
//! - [`manifest`]: appending auth queries to manifest URI lines

pub mod manifest;
pub mod object_key;

pub use manifest::ManifestRewriter;
pub use object_key::{
    encode_path_segment, is_manifest_key, validate_stream_id, variant_manifest_name,
    ObjectKeyResolver,
};
