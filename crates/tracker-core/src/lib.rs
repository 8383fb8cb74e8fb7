//! # Tracker Core
//!
//! Core modules shared by the delivery tracker crates.

mod error;
mod mailbox;
mod provider;

pub use crate::error::*;
pub use crate::mailbox::*;
pub use crate::provider::*;
