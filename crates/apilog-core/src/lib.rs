pub mod aggregate;
pub mod error;
pub mod log;
pub mod normalize;
pub mod search;

pub use error::{Error, Result};
