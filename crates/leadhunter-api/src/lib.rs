//! Async client for the LeadHunter managed backend.
//!
//! The backend exposes three surfaces, all wrapped here:
//!
//! - **REST rows**: PostgREST-style CRUD under `/rest/v1/{table}`, with
//!   embedded joins in the `select` parameter and `column=eq.value` filters.
//! - **Auth**: password sign-in under `/auth/v1/token`, producing a
//!   [`Session`] whose access token authorizes subsequent row requests.
//! - **Realtime**: a WebSocket change feed that pushes a [`ChangeEvent`]
//!   whenever a row in a watched table is inserted, updated, or deleted.
//!
//! Consumers depend on the [`Gateway`] trait rather than the concrete
//! [`RestGateway`], so the data layer can be driven by test doubles.

pub mod auth;
pub mod client;
pub mod error;
pub mod gateway;
pub mod query;
pub mod realtime;
pub mod rows;
pub mod transport;

pub use auth::{Credentials, Session};
pub use client::RestGateway;
pub use error::Error;
pub use gateway::{ChangeSubscription, Gateway, SubscriptionEvent};
pub use query::{Filter, Order, Query, Table};
pub use realtime::{ChangeEvent, ChangeKind, RealtimeHandle, ReconnectConfig};
pub use transport::{TlsMode, TransportConfig};
