//! Common utilities and types shared across Downwatch components.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
