//! # infrasnap – Management REST API client
//!
//! Talks to the infrastructure-management REST API (`https://{server}/api`)
//! with token authentication and implements the `InventorySource`
//! capability: schema resolution (OPTIONS introspection), paginated listing
//! (`links.next` chains), and single-entity expansion.
//!
//! ## Modules
//!
//! - **transport** — `RestTransport` trait + reqwest implementation
//! - **client** — `ApiClient`: schema cache, paginated fetcher, entity fetcher
//! - **auth** — Basic-auth token exchange (`GET /api/auth`)

pub mod auth;
pub mod client;
pub mod transport;

pub use client::ApiClient;
pub use transport::{HttpTransport, RestTransport};
