//! Approval Request Emitter: describes a suspended tool call to a human
//! and offers approve/reject actions that round-trip into a `Decision`.

mod widget;
pub use widget::*;

mod emitter;
pub use emitter::*;
