//! Error types crossing the crate boundary.
//!
//! Exactly two recoverable kinds exist: [`Error::InvalidInput`] for bytes the
//! caller supplied that do not decode, and [`Error::VerificationFailed`] for a
//! proof or credential check that did not pass. Verification failures are
//! deliberately unitary; no sub-check is distinguishable from another.
//! Anything else is an internal invariant violation and panics.

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The supplied bytes are the wrong length, are a non-canonical encoding,
    /// or do not describe a valid group element or structure.
    #[error("invalid input")]
    InvalidInput,
    /// A proof or credential did not verify. Treat as "not authorized".
    #[error("verification failed")]
    VerificationFailed,
}

impl From<lox_zkp::ProofError> for Error {
    fn from(_: lox_zkp::ProofError) -> Self {
        Error::VerificationFailed
    }
}
