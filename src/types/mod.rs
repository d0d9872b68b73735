//! Type definitions

pub mod ai;
pub mod auth;
pub mod calculation;
pub mod classification;
pub mod common;
pub mod conversation;
pub mod cost_report;
pub mod data_source;
pub mod data_template;
pub mod department;
pub mod dimension;
pub mod hospital;
pub mod import;
pub mod metric;
pub mod model;
pub mod reference_value;
pub mod report;

pub use ai::*;
pub use auth::*;
pub use calculation::*;
pub use classification::*;
pub use common::*;
pub use conversation::*;
pub use cost_report::*;
pub use data_source::*;
pub use data_template::*;
pub use department::*;
pub use dimension::*;
pub use hospital::*;
pub use import::*;
pub use metric::*;
pub use model::*;
pub use reference_value::*;
pub use report::*;
