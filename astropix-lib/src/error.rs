use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The input stream could not be opened or read in full.
    #[error("cannot open the file {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A candidate record contained something other than hex digit pairs.
    #[error("invalid hex in record {text:?}: {source}")]
    InvalidHex {
        text: String,
        #[source]
        source: hex::FromHexError,
    },

    #[error("Invalid decode config: {0}")]
    Config(String),

    /// A decoded text row did not match the hit row layout.
    #[error("invalid hit row: {0}")]
    InvalidRow(String),

    #[error("output {0:?} would overwrite the input")]
    OutputCollision(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
