pub mod config;
pub mod csr;
pub mod error;
pub mod error_handler;
pub mod generator;
pub mod key;
pub mod routes;
pub mod subject;

pub use crate::csr::{generate_csr, verify_request, verify_request_der, CertificateSigningRequest};
pub use crate::error::CsrError;
pub use crate::generator::{CsrFormat, CsrGenerator, CsrResult, GenerateOptions};
pub use crate::key::{Algorithm, KeyPair, KeyPairGenerator, OsRngKeyPairGenerator};
pub use crate::subject::SubjectIdentity;
