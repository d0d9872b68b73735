//! Client-side workflows built on the API wrappers

pub mod menus;
pub mod render;
pub mod routes;
pub mod tree;
pub mod wizard;
