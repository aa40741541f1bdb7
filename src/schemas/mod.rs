//! Wire and storage shapes shared by every component.
//!
//! Item and event kinds are closed enums; consumers match exhaustively
//! instead of inspecting type tags at runtime.

mod decision;
mod events;
mod input;
mod items;
mod widgets;

pub use decision::*;
pub use events::*;
pub use input::*;
pub use items::*;
pub use widgets::*;
