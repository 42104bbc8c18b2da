//! # Postmark Client
//! Asynchronous wrapper around the Postmark transactional email HTTP API, exposing remote records as typed Rust values through [`ApiClient`] and resource types such as [`Bounce`].
//!
//! ## Audience and uses
//! For Rust services that send mail through Postmark and need to inspect or act on bounces: look up a bounce with [`Bounce::find`], page through them with [`Bounce::all`], fetch the SMTP dump, or reactivate a recipient with [`Bounce::activate`].
//!
//! ## Runtime requirements
//! Async-only; run inside a Tokio (v1) runtime. The default transport uses `reqwest`; any other HTTP stack can be plugged in by implementing [`Transport`].
//!
//! ## Key casing
//! The service spells JSON keys as capitalized words (`MessageID`, `BouncedAt`). Responses are translated to `snake_case` (`message_id`, `bounced_at`) by [`KeyTranslator`] before they reach typed records, and payloads are translated back on the way out. Acronyms the service spells in capitals live in a configurable table.
//!
//! ## Shared client
//! Resources built without an explicit client use the process-wide client from [`registry::api_client`], configured from `POSTMARK_*` environment variables on first use (see [`ClientConfig`]). Every resource operation also has a `*_with` form taking an explicit client.
//!
//! ## Errors
//! Transport failures, rate limiting and 5xx responses are retried according to the client's [`RetryPolicy`]; authentication failures, missing resources, validation errors and undecodable bodies are returned at once. The crate-wide [`Result`] alias wraps [`Error`].
//!
//! ## Example
//! ```no_run
//! use postmark_client::{ApiClient, Bounce, BounceQuery};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), postmark_client::Error> {
//!     let client = Arc::new(ApiClient::new("server-token")?);
//!
//!     for bounce in Bounce::all_with(&client, &BounceQuery::new().inactive(true)).await? {
//!         println!("{} bounced: {}", bounce.email().unwrap_or("?"), bounce.kind());
//!         if bounce.can_activate() {
//!             let activated = bounce.activate().await?;
//!             println!("reactivated: {}", !activated.is_inactive());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod bounce;
mod casing;
mod client;
mod config;
mod error;
mod models;
pub mod registry;
mod retry;
mod transport;

pub use async_trait::async_trait;
pub use bounce::Bounce;
pub use casing::KeyTranslator;
pub use client::{ApiClient, ApiClientBuilder, LocalRecord};
pub use config::{ClientConfig, DEFAULT_API_URL};
pub use error::Error;
pub use models::{BounceCount, BounceQuery, BounceType, DEFAULT_PAGE_SIZE, DeliveryStats};
pub use retry::{Backoff, RetryPolicy};
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError,
    TransportErrorKind,
};

/// Result type alias for Postmark operations.
///
/// This is equivalent to `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
