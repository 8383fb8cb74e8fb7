//! CDC connector
//!
//! Registers the change-capture connector with its control plane at startup.
//! Registration is idempotent: a connector that already exists counts as
//! success.

mod registration;

pub use self::registration::*;
