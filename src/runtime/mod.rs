//! Run state, its codec, history merging and the execution runtime.

mod error;
pub use error::*;

mod run_state;
pub use run_state::*;

mod codec;
pub use codec::*;

mod merge;
pub use merge::*;

mod runner;
pub use runner::*;
