use std::{error, fmt};

// -------------------------------------------------------------------------------------------------

/// Provides an enumeration of all possible errors reported by binterpolate.
#[derive(Debug)]
pub enum Error {
    InvalidTransformSize(usize),
    InvalidSampleRate(u32),
    ParameterError(String),
    SendError(String),
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTransformSize(size) => {
                write!(f, "Invalid transform size (bin count): {size}")
            }
            Self::InvalidSampleRate(rate) => write!(f, "Invalid sample rate: {rate}"),
            Self::ParameterError(str) => write!(f, "Invalid parameter: {str}"),
            Self::SendError(str) => write!(f, "Failed to send control message: {str}"),
        }
    }
}
