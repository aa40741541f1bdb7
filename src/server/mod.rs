//! Resume controller and the request plumbing around it.

mod config;
pub use config::*;

mod context;
pub use context::*;

mod controller;
pub use controller::*;

mod locks;
pub use locks::*;

mod phase;
pub use phase::*;
