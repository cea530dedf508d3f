//! # Realtime Core
//!
//! Core modules shared by the live transit map crates.

mod error;
mod notify;
mod provider;

pub use crate::error::*;
pub use crate::notify::*;
pub use crate::provider::*;
