//! Agent definitions and where they come from.

mod definition;
pub use definition::*;

mod loader;
pub use loader::*;

mod hitl;
pub use hitl::*;

mod error;
pub use error::*;
