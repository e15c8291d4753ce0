//! # infrasnap – Core
//!
//! Shared building blocks for the inventory snapshot collector.
//!
//! ## Modules
//!
//! - **config** — Immutable run configuration passed to every component
//! - **error** — Source error type shared by the query-side crates
//! - **source** — `InventorySource` capability trait (paginated REST querying)
//! - **sanitize** — Recursive document sanitizer (nulls, blanks, internal ids)

pub mod config;
pub mod error;
pub mod sanitize;
pub mod source;
