use std::error::Error;
use thiserror::Error;
use warp::reject::Reject;

/// All errors that generating a certificate signing request can produce
#[derive(Error, Debug)]
pub enum CsrError {
    /// A required subject field is missing or a field is malformed
    #[error("Invalid subject field '{field}': {reason}")]
    InvalidSubject { field: &'static str, reason: String },

    /// The requested algorithm is not one of the supported ones
    #[error("Unsupported algorithm '{name}': {reason}")]
    UnsupportedAlgorithm { name: String, reason: String },

    /// A caller-supplied private key could not be decoded
    #[error("Invalid private key: {reason}")]
    InvalidPrivateKey { reason: String },

    /// An encoded request could not be parsed or its signature does not verify
    #[error("Invalid certificate signing request: {reason}")]
    InvalidRequest { reason: String },

    /// The random source or the key generation routine failed
    #[error("Key generation failed for {algorithm}")]
    KeyGenerationFailure {
        algorithm: String,
        source: Box<dyn Error + Send + Sync>,
    },

    /// Signing the certification request info failed
    #[error("Failed to sign the certificate signing request")]
    SigningFailure {
        source: Box<dyn Error + Send + Sync>,
    },

    /// Represents an unexpected error in encoding or in the runtime
    #[error("Internal error occurred: {context}")]
    InternalFailure {
        context: &'static str,
        source: Box<dyn Error + Send + Sync>,
    },
}

impl CsrError {
    pub(crate) fn invalid_subject<R: Into<String>>(field: &'static str, reason: R) -> Self {
        CsrError::InvalidSubject {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported_algorithm<N: Into<String>, R: Into<String>>(
        name: N,
        reason: R,
    ) -> Self {
        CsrError::UnsupportedAlgorithm {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn internal<E: Error + Send + Sync + 'static>(
        context: &'static str,
        source: E,
    ) -> Self {
        CsrError::InternalFailure {
            context,
            source: Box::new(source),
        }
    }

    /// Whether the failure was caused by the caller's input rather than by
    /// this process
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            CsrError::InvalidSubject { .. }
                | CsrError::UnsupportedAlgorithm { .. }
                | CsrError::InvalidPrivateKey { .. }
                | CsrError::InvalidRequest { .. }
        )
    }
}

impl Reject for CsrError {}

#[cfg(test)]
mod tests {
    use super::CsrError;
    use std::error::Error;

    #[test]
    fn display_carries_field_and_reason() {
        let err = CsrError::invalid_subject("commonName", "cannot be empty");
        assert_eq!(
            err.to_string(),
            "Invalid subject field 'commonName': cannot be empty"
        );
        assert!(err.is_caller_error());
    }

    #[test]
    fn internal_failure_keeps_source() {
        let source = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = CsrError::internal("encoding request", source);
        assert!(!err.is_caller_error());
        assert_eq!(err.source().unwrap().to_string(), "boom");
    }
}
