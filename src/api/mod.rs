//! Typed wrappers over the backend REST endpoints
//!
//! One module per resource family. Functions take the shared `ApiClient`
//! and return decoded payloads; envelopes are unwrapped here so callers
//! never see `{code, message, data}`.

pub mod ai;
pub mod auth;
pub mod calculation;
pub mod classification;
pub mod conversations;
pub mod cost_reports;
pub mod data_sources;
pub mod data_templates;
pub mod departments;
pub mod hospitals;
pub mod metrics;
pub mod model;
pub mod reports;
