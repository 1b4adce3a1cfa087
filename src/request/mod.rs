//! Per-request context
//!
//! [`RequestContext`] is built once per request from the carrier entries the
//! middleware stages publish, and hands handlers the caller identity, role
//! checks, a request-scoped span and JSON body helpers.

pub mod body;
pub mod carrier;
mod context;

pub use body::{BodyValidator, FieldViolation, Violations};
pub use carrier::AuthState;
pub use context::RequestContext;
