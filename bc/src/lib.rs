//! BoardClient - resilient client for a work-item tracking backend
//!
//! Wraps every outbound call to the tracking API behind a retry policy that
//! understands rate limiting (429 + Retry-After), token expiry (401), and
//! transient server failures (5xx / network), and splits oversized id-list
//! lookups into concurrent chunks below the backend's hard batch cap.
//!
//! # Modules
//!
//! - [`transport`] - HTTP seam: request/response value types and the reqwest
//!   implementation
//! - [`auth`] - credential provider: static tokens and OAuth
//!   client-credential exchange with expiry-buffered caching
//! - [`client`] - retry wrapper, typed operations, batch fetch, relation
//!   traversal
//! - [`types`] - work-item wire types and field-name constants
//! - [`config`] - retry tuning and credential material
//! - [`error`] - error taxonomy

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod transport;
pub mod types;

pub use auth::{BoardCredentials, CachedToken, CredentialProvider};
pub use client::{BoardApi, BoardClient, MAX_BATCH};
pub use config::{CredentialsConfig, RetryConfig};
pub use error::ClientError;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, RequestBody, Transport, TransportError};
pub use types::{ListResponse, QueryResponse, Relation, WorkItem, fields, relations};
