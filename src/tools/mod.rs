mod tool;
pub use tool::*;

mod runtime;
pub use runtime::*;

mod context;
pub use context::*;

mod stream;
pub use stream::*;

mod theme;
pub use theme::*;

mod error;
pub use error::*;
