// SPDX-License-Identifier: MPL-2.0
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A caller supplied a value outside the accepted domain
    /// (non-positive window width, zero grid dimension, ...).
    /// The state the caller passed in is left unchanged.
    InvalidArgument(String),

    /// The rendering engine or its worker subsystem failed to start.
    /// Surfaced as a blocking viewer error; recovery is a manual reload.
    EngineInit(String),

    /// A single frame failed to decode or load. The affected panel keeps
    /// its last successfully displayed frame.
    ImageLoad(ImageLoadError),

    /// Encoding a captured frame for export failed.
    Export(String),

    Config(String),
    Io(String),
}

/// Specific error types for frame loading issues reported by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageLoadError {
    /// The image id does not resolve to any fetchable resource.
    NotFound(String),

    /// The engine fetched the resource but could not decode it.
    DecodeFailed(String),

    /// Network or transport failure while fetching.
    TransferFailed(String),

    /// Generic error with raw message.
    Other(String),
}

impl ImageLoadError {
    /// Categorizes a raw engine error message into a specific load error.
    pub fn from_message(msg: &str) -> Self {
        let msg_lower = msg.to_lowercase();

        if msg_lower.contains("not found") || msg_lower.contains("404") {
            return ImageLoadError::NotFound(msg.to_string());
        }

        if msg_lower.contains("decode")
            || msg_lower.contains("parse")
            || msg_lower.contains("invalid data")
            || msg_lower.contains("corrupt")
        {
            return ImageLoadError::DecodeFailed(msg.to_string());
        }

        if msg_lower.contains("network")
            || msg_lower.contains("timeout")
            || msg_lower.contains("connection")
        {
            return ImageLoadError::TransferFailed(msg.to_string());
        }

        ImageLoadError::Other(msg.to_string())
    }
}

impl fmt::Display for ImageLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageLoadError::NotFound(msg) => write!(f, "Image not found: {}", msg),
            ImageLoadError::DecodeFailed(msg) => write!(f, "Decoding failed: {}", msg),
            ImageLoadError::TransferFailed(msg) => write!(f, "Transfer failed: {}", msg),
            ImageLoadError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(e) => write!(f, "Invalid argument: {}", e),
            Error::EngineInit(e) => write!(f, "Engine initialization failed: {}", e),
            Error::ImageLoad(e) => write!(f, "Image load error: {}", e),
            Error::Export(e) => write!(f, "Export error: {}", e),
            Error::Config(e) => write!(f, "Config error: {}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl From<ImageLoadError> for Error {
    fn from(err: ImageLoadError) -> Self {
        Error::ImageLoad(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
