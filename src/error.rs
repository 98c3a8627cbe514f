use thiserror::Error;

/// Errors produced while encoding or decoding the flag cookie payload.
///
/// Public parse entry points never surface these: every decode failure degrades to
/// the all-defaults flag set. They exist for [`crate::FlagSessionCodec::try_decode`]
/// and for logging.
#[derive(Debug, Error)]
pub enum Error {
    #[error("flag cookie payload could not be encoded: {0}")]
    Encode(String),

    #[error("flag cookie payload could not be decoded: {0}")]
    Decode(String),

    #[error("unsupported flag cookie version: {0}")]
    UnsupportedVersion(u8),

    #[error("flag cookie signature verification failed")]
    Verification,
}
