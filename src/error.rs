use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Sign/verification error.
///
/// Every variant is terminal. The message names the step that failed (which
/// header, which key, which decode) so callers can log it as-is.
#[derive(Debug, Error)]
pub enum Error {
    /// Key data is invalid, on the wrong curve, or no key source was given.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Caller supplied a malformed argument, e.g. a path without a leading `/`.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The `Tl-Signature` value is not a well-formed detached JWS.
    #[error("invalid signature format: {0}")]
    SignatureFormat(String),

    /// JWS signing or verification failed.
    #[error("jws signing/verification failed: {0}")]
    Signature(String),
}

impl Error {
    pub(crate) fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey(message.into())
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub(crate) fn format(message: impl Into<String>) -> Self {
        Self::SignatureFormat(message.into())
    }

    pub(crate) fn signature(message: impl Into<String>) -> Self {
        Self::Signature(message.into())
    }
}
