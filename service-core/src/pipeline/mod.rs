//! Declarative request pipeline.
//!
//! Endpoints are declared with [`PipelineConfig::builder`] and mounted with
//! [`PipelineExecutor::endpoint`]. Every request passes the same gates in the
//! same order, and every failure leaves through [`AppError`]'s envelope.
//!
//! [`AppError`]: crate::error::AppError

mod builder;
mod context;
mod executor;
mod response;
mod validation;

pub use builder::{
    BuildError, HandlerFn, OwnershipRule, PipelineBuilder, PipelineConfig, RouteHandler, handler_fn,
};
pub use context::{RequestContext, UploadedFile};
pub use executor::{DEFAULT_MAX_BODY_BYTES, PipelineExecutor};
pub use response::HandlerResponse;
pub use validation::{Schema, Validated, ValidationSchema, sanitize_message};
