//! Common utilities for the optnet toolkit

pub mod error;

pub use error::{Error, Result};
