//! service-core: request pipeline kernel shared by the gig marketplace
//! services.
//!
//! Provides the event bus, the authorization model, identity resolution, a
//! table-oriented row store and the declarative request pipeline that ties
//! them together, plus the usual error, config and tracing plumbing.
pub mod authz;
pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod middleware;
pub mod observability;
pub mod pipeline;
pub mod store;

pub use async_trait;
pub use axum;
pub use serde;
pub use serde_json;
pub use sqlx;
pub use tokio;
pub use tower;
pub use tower_http;
pub use tracing;
pub use validator;
