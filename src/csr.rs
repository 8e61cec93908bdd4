//! PKCS#10 certificate signing requests.
//!
//! [`generate_csr`] binds a validated subject to the public half of a
//! [`KeyPair`] and signs the request with the private half:
//!
//! | key         | signature algorithm                   |
//! |-------------|---------------------------------------|
//! | RSA         | sha256WithRSAEncryption (PKCS#1 v1.5) |
//! | ECDSA P-256 | ecdsa-with-SHA256                     |
//! | ECDSA P-384 | ecdsa-with-SHA384                     |
//!
//! [`verify_request`] and [`verify_request_der`] check a request
//! independently of how it was produced.

use crate::error::CsrError;
use crate::key::KeyPair;
use crate::subject::{self, SubjectIdentity};
use const_oid::{
    db::rfc5912::{
        ECDSA_WITH_SHA_256, ECDSA_WITH_SHA_384, ID_EC_PUBLIC_KEY, RSA_ENCRYPTION, SECP_256_R_1,
        SECP_384_R_1, SHA_256_WITH_RSA_ENCRYPTION,
    },
    ObjectIdentifier,
};
use der::{asn1::Ia5String, pem::LineEnding, Decode, Encode};
use rsa::{
    pkcs1v15,
    signature::{Keypair, Signer, Verifier},
    RsaPublicKey,
};
use sha2::Sha256;
use spki::{
    DecodePublicKey, DynSignatureAlgorithmIdentifier, EncodePublicKey, SignatureBitStringEncoding,
};
use x509_cert::{
    builder::{Builder, RequestBuilder},
    ext::pkix::{name::GeneralName, SubjectAltName},
    name::Name,
    request::CertReq,
};

const PEM_LABEL: &str = "CERTIFICATE REQUEST";
const LEGACY_PEM_LABEL: &str = "NEW CERTIFICATE REQUEST";

/// A signed PKCS#10 certification request
#[derive(Debug, Clone)]
pub struct CertificateSigningRequest {
    inner: CertReq,
}

/// Builds and signs a request for `subject` with `key_pair`
pub fn generate_csr(
    subject: &SubjectIdentity,
    key_pair: &KeyPair,
) -> Result<CertificateSigningRequest, CsrError> {
    let name = subject.to_name()?;
    let alt_names = subject_alt_name(&subject.dns_names)?;

    let inner = match key_pair {
        KeyPair::Rsa(key) => {
            let signer = pkcs1v15::SigningKey::<Sha256>::new(key.clone());
            build_request::<_, pkcs1v15::Signature>(name, &signer, alt_names.as_ref())?
        }
        KeyPair::P256(key) => {
            build_request::<_, p256::ecdsa::DerSignature>(name, key, alt_names.as_ref())?
        }
        KeyPair::P384(key) => {
            build_request::<_, p384::ecdsa::DerSignature>(name, key, alt_names.as_ref())?
        }
    };

    Ok(CertificateSigningRequest { inner })
}

/// Parses a PEM request and checks its signature against its own public key
pub fn verify_request(pem: &str) -> Result<CertificateSigningRequest, CsrError> {
    let request = CertificateSigningRequest::from_pem(pem)?;
    request.verify()?;
    Ok(request)
}

/// Same as [`verify_request`] for a DER-encoded request
pub fn verify_request_der(der: &[u8]) -> Result<CertificateSigningRequest, CsrError> {
    let request = CertificateSigningRequest::from_der(der)?;
    request.verify()?;
    Ok(request)
}

fn build_request<S, Signature>(
    subject: Name,
    signer: &S,
    alt_names: Option<&SubjectAltName>,
) -> Result<CertReq, CsrError>
where
    S: Keypair + DynSignatureAlgorithmIdentifier + Signer<Signature>,
    S::VerifyingKey: EncodePublicKey,
    Signature: SignatureBitStringEncoding,
{
    let mut builder = RequestBuilder::new(subject, signer)
        .map_err(|e| CsrError::internal("preparing certification request info", e))?;
    if let Some(alt_names) = alt_names {
        builder
            .add_extension(alt_names)
            .map_err(|e| CsrError::internal("adding subjectAltName request", e))?;
    }
    builder
        .build::<Signature>()
        .map_err(|e| CsrError::SigningFailure {
            source: Box::new(e),
        })
}

fn subject_alt_name(dns_names: &[String]) -> Result<Option<SubjectAltName>, CsrError> {
    if dns_names.is_empty() {
        return Ok(None);
    }
    let names = dns_names
        .iter()
        .map(|name| {
            Ia5String::new(name)
                .map(GeneralName::DnsName)
                .map_err(|e| CsrError::internal("encoding DNS name", e))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(SubjectAltName(names)))
}

fn invalid_request<E: std::fmt::Display>(e: E) -> CsrError {
    CsrError::InvalidRequest {
        reason: e.to_string(),
    }
}

impl CertificateSigningRequest {
    pub fn from_der(der: &[u8]) -> Result<Self, CsrError> {
        let inner = CertReq::from_der(der).map_err(invalid_request)?;
        Ok(CertificateSigningRequest { inner })
    }

    /// Accepts both the `CERTIFICATE REQUEST` and the legacy
    /// `NEW CERTIFICATE REQUEST` labels
    pub fn from_pem(pem: &str) -> Result<Self, CsrError> {
        let (label, der) =
            der::pem::decode_vec(pem.trim().as_bytes()).map_err(invalid_request)?;
        if label != PEM_LABEL && label != LEGACY_PEM_LABEL {
            return Err(CsrError::InvalidRequest {
                reason: format!("unexpected PEM label {}", label),
            });
        }
        Self::from_der(&der)
    }

    pub fn to_der(&self) -> Result<Vec<u8>, CsrError> {
        self.inner
            .to_der()
            .map_err(|e| CsrError::internal("encoding request as DER", e))
    }

    pub fn to_pem(&self) -> Result<String, CsrError> {
        let der = self.to_der()?;
        der::pem::encode_string(PEM_LABEL, LineEnding::LF, &der)
            .map_err(|e| CsrError::internal("encoding request as PEM", e))
    }

    pub fn common_name(&self) -> Option<String> {
        subject::common_name_of(&self.inner.info.subject)
    }

    /// The `subject` as recorded in the request
    pub fn subject(&self) -> &Name {
        &self.inner.info.subject
    }

    pub fn signature_algorithm(&self) -> ObjectIdentifier {
        self.inner.algorithm.oid
    }

    /// DER-encoded SubjectPublicKeyInfo embedded in the request
    pub fn public_key_der(&self) -> Result<Vec<u8>, CsrError> {
        self.inner
            .info
            .public_key
            .to_der()
            .map_err(|e| CsrError::internal("encoding embedded public key", e))
    }

    /// Number of attributes (such as an extension request) in the request info
    pub fn attribute_count(&self) -> usize {
        self.inner.info.attributes.len()
    }

    /// Verifies the request's signature with the public key it carries
    pub fn verify(&self) -> Result<(), CsrError> {
        let message = self
            .inner
            .info
            .to_der()
            .map_err(|e| CsrError::internal("encoding certification request info", e))?;
        let signature = self.inner.signature.as_bytes().ok_or_else(|| {
            CsrError::InvalidRequest {
                reason: "signature is not an octet-aligned bit string".to_string(),
            }
        })?;
        let spki_der = self.public_key_der()?;
        let key_algorithm = &self.inner.info.public_key.algorithm;
        let signature_algorithm = self.signature_algorithm();

        let verified = if key_algorithm.oid == RSA_ENCRYPTION {
            expect_signature_algorithm(signature_algorithm, SHA_256_WITH_RSA_ENCRYPTION)?;
            let key = RsaPublicKey::from_public_key_der(&spki_der).map_err(invalid_request)?;
            let signature = pkcs1v15::Signature::try_from(signature).map_err(invalid_request)?;
            pkcs1v15::VerifyingKey::<Sha256>::new(key).verify(&message, &signature)
        } else if key_algorithm.oid == ID_EC_PUBLIC_KEY {
            let curve: ObjectIdentifier = key_algorithm
                .parameters
                .as_ref()
                .ok_or_else(|| CsrError::InvalidRequest {
                    reason: "EC public key without curve parameters".to_string(),
                })?
                .decode_as()
                .map_err(invalid_request)?;
            if curve == SECP_256_R_1 {
                expect_signature_algorithm(signature_algorithm, ECDSA_WITH_SHA_256)?;
                let key = p256::ecdsa::VerifyingKey::from_public_key_der(&spki_der)
                    .map_err(invalid_request)?;
                let signature =
                    p256::ecdsa::DerSignature::from_bytes(signature).map_err(invalid_request)?;
                key.verify(&message, &signature)
            } else if curve == SECP_384_R_1 {
                expect_signature_algorithm(signature_algorithm, ECDSA_WITH_SHA_384)?;
                let key = p384::ecdsa::VerifyingKey::from_public_key_der(&spki_der)
                    .map_err(invalid_request)?;
                let signature =
                    p384::ecdsa::DerSignature::from_bytes(signature).map_err(invalid_request)?;
                key.verify(&message, &signature)
            } else {
                return Err(CsrError::InvalidRequest {
                    reason: format!("unsupported curve {}", curve),
                });
            }
        } else {
            return Err(CsrError::InvalidRequest {
                reason: format!("unsupported key algorithm {}", key_algorithm.oid),
            });
        };

        verified.map_err(|_| CsrError::InvalidRequest {
            reason: "signature does not verify with the embedded public key".to_string(),
        })
    }
}

fn expect_signature_algorithm(
    actual: ObjectIdentifier,
    expected: ObjectIdentifier,
) -> Result<(), CsrError> {
    if actual == expected {
        Ok(())
    } else {
        Err(CsrError::InvalidRequest {
            reason: format!(
                "signature algorithm {} does not match key type (expected {})",
                actual, expected
            ),
        })
    }
}
