pub mod error;
pub mod session;

pub use error::{ReelwatchError, Result};
pub use session::Session;
