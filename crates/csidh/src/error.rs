//! Error kinds surfaced by the key-agreement engine.

/// Errors returned by construction and the key operations.
///
/// Construction errors are fatal to the constructor; per-call errors are
/// reported to the caller. No operation ever returns a truncated byte
/// string alongside an error.
#[derive(Debug, thiserror::Error)]
pub enum CsidhError {
    /// Unsupported `prime`, `formula`, `style`, `curvemodel` or exponent
    /// at construction.
    #[error("unsupported parameter: {0}")]
    InvalidParameter(&'static str),

    /// The peer's public curve failed the supersingularity / class check.
    ///
    /// No curve output is produced; nothing about the secret key leaks
    /// beyond the fact of rejection.
    #[error("public key is not a valid curve in the CSIDH class")]
    InvalidPublicKey,

    /// Secret key of the wrong width, or an exponent outside the
    /// style's domain.
    #[error("secret key has invalid length or exponent domain")]
    InvalidSecretKey,

    /// An internal consistency check failed (e.g. an isogeny kernel of
    /// unexpected order). Indicates an implementation bug; the operation
    /// aborts rather than emit a wrong shared secret.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(&'static str),

    /// The SDAC cache could not be read or written.
    ///
    /// Never surfaced by the key operations themselves: cache failures
    /// degrade silently to in-memory regeneration.
    #[error("sdac cache i/o")]
    Io(#[from] std::io::Error),
}
