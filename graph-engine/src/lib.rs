//! # graph-engine
//!
//! Per-tenant access to Microsoft Graph with OAuth2 client-credential tokens.
//!
//! ## Components
//!
//! - **TokenAcquirer:** Client-credentials exchange against the identity provider.
//! - **TokenCache:** One token per tenant, refreshed before expiry, with
//!   coalesced acquisition.
//! - **GraphClient:** Graph calls with token refresh on 401, throttling and
//!   backoff, lazy pagination and per-item batch results.

pub mod acquirer;
pub mod client;
pub mod error;
pub mod models;
pub mod operations;
pub mod retry;
pub mod tenant;
pub mod token_cache;

pub use acquirer::{AcquiredToken, DEFAULT_AUTHORITY, DEFAULT_GRAPH_SCOPE, TokenAcquirer};
pub use client::{DEFAULT_GRAPH_ENDPOINT, GraphClient, GraphRequest};
pub use error::{GraphError, ProviderError, TokenError};
pub use operations::GLOBAL_ADMIN_TEMPLATE_ID;
pub use retry::RetryPolicy;
pub use tenant::{TenantCredential, TenantRegistry};
pub use token_cache::{CachedToken, DEFAULT_SAFETY_MARGIN, TokenCache};
