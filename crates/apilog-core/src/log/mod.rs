mod reader;
mod types;

pub use reader::{LoadedLog, LogReader, REQUIRED_COLUMNS, SkippedRow};
pub use types::*;
