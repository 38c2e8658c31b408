//! Request handlers.

pub mod health;
pub mod novels;

pub use health::*;
pub use novels::*;
