use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read access log: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse access log: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid access log format: {0}")]
    InputFormat(String),

    #[error("Malformed record: {0}")]
    RecordParse(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;
