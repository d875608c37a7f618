//! Core constants, error types, and collaborator traits.
//!
//! Always compiled; every other module builds on these.

pub mod constants;
mod error;
mod traits;

pub use error::*;
pub use traits::*;
