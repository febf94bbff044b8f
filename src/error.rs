use thiserror::Error;

/// Error taxonomy for the digit recognition core.
///
/// Every operation in the core is a deterministic pure function of its
/// inputs, so none of these are retryable: the same input always produces
/// the same failure.
#[derive(Error, Debug)]
pub enum Error {
    /// The submitted payload could not be turned into a decoded image:
    /// malformed base64, undecodable bytes, or an unsupported format.
    /// Recoverable per request: the caller should ask for a valid image.
    #[error("invalid image data: {reason}")]
    InvalidImageData { reason: String },

    /// The weight file is missing, unreadable, incompatible with the fixed
    /// network topology, or produced invalid numeric output. Fatal at
    /// startup; a 5xx-class failure if detected mid-serving.
    #[error("model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    /// A grid with the wrong shape reached the classifier. The normalizer
    /// guarantees the declared input resolution, so this signals a bug in
    /// the caller, not a user error.
    #[error("invalid classifier input: expected {expected}, got {actual}")]
    InvalidInput { expected: String, actual: String },
}

impl Error {
    pub fn invalid_image(reason: impl Into<String>) -> Error {
        Error::InvalidImageData { reason: reason.into() }
    }

    pub fn model_unavailable(reason: impl Into<String>) -> Error {
        Error::ModelUnavailable { reason: reason.into() }
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
