//! Typed query functions, one module per table.

pub mod songs;
