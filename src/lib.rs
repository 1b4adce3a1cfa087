//! reqctx - authenticated request context for axum services
//!
//! Every request that reaches a handler carries a [`RequestContext`]:
//! - a request id assigned by the request-id layer
//! - the caller's verified token and claims, when a bearer token was sent
//! - `is_user` / `is_admin` role checks
//! - a span tagged with the request id
//! - JSON body decoding with a separate validation stage

pub mod auth;
pub mod config;
pub mod error;
pub mod request;
pub mod routes;
pub mod state;

pub use error::{AppError, BodyError, ContextError};
pub use request::RequestContext;
pub use state::{AppState, SharedState};
