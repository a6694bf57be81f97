//! Error type shared by every page operation.

use serde::Serialize;
use thiserror::Error;

/// Encoder failure codes, numbered the way the splash raster library numbers them.
pub mod codes {
    /// The destination stream could not be written.
    pub const OPEN_FILE: i32 = 10;
    /// The encoder rejected one of its parameters.
    pub const BAD_ARG: i32 = 14;
    /// The bitmap has no pixels.
    pub const ZERO_IMAGE: i32 = 254;
    /// Any other encoder failure.
    pub const GENERIC: i32 = 255;
}

/// Errors that can occur during page operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed, missing or out-of-range argument.
    #[error("{0}")]
    Validation(String),

    /// Page index or slice component out of range.
    #[error("{0}")]
    Bounds(String),

    /// The owning document has been closed.
    #[error("Document closed. You must delete this page")]
    StaleReference,

    #[error("Result image is too big: {pixels} pixels exceeds the limit of {limit}")]
    ResourceLimit { pixels: u64, limit: u64 },

    /// Encoder reported failure, tagged with its numeric code.
    #[error("SplashError {code}: {message}")]
    Encode { code: i32, message: String },

    /// Content could not be parsed, or an output file could not be created.
    #[error("{0}")]
    Open(String),

    /// The raster engine could not be bound or failed to paint the page.
    #[error("Raster engine failure: {0}")]
    Engine(String),
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub(crate) fn bounds(message: impl Into<String>) -> Self {
        Error::Bounds(message.into())
    }

    pub(crate) fn encode(code: i32, message: impl Into<String>) -> Self {
        Error::Encode {
            code,
            message: message.into(),
        }
    }
}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
