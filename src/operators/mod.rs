// src/operators/mod.rs
/// Discrete differential operators on uniform grids.
pub mod curl;
pub mod gradient;

pub use curl::{curl, curl_field};
pub use gradient::{gradient, partial_derivative};
