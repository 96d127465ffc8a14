//! CLI command implementations.

pub mod check;
pub mod common;
pub mod render;
pub mod submit;
