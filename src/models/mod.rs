//! Data models for the quotes backend.
//!
//! Field names follow the JSON contract consumed by the static front-end.

mod quote;
mod series;

pub use quote::*;
pub use series::*;
