//! Hospital value accounting client
//!
//! Typed wrappers for the backend REST API, the session/hospital context
//! they run in, and the client-side workflows on top: staged spreadsheet
//! imports, tree reorder/delete and menu/route gating.

pub mod api;
pub mod error;
pub mod http;
pub mod services;
pub mod session;
pub mod types;

pub use error::{ApiError, ApiResult};
