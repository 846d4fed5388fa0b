//! Shared models

mod error;
mod span;

pub use error::{CpgError, Result};
pub use span::{Location, Region};
