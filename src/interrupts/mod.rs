//! Interruption matching: ties an external decision to one suspended call.

mod error;
pub use error::*;

mod matcher;
pub use matcher::*;
