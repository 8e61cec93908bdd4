use crate::error::CsrError;
use const_oid::{
    db::rfc5912::{ID_EC_PUBLIC_KEY, RSA_ENCRYPTION, SECP_256_R_1, SECP_384_R_1},
    ObjectIdentifier,
};
use der::Decode;
use pkcs8::{EncodePrivateKey, LineEnding, PrivateKeyInfo, SecretDocument};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use rsa::{pkcs1::DecodeRsaPrivateKey, traits::PublicKeyParts, RsaPrivateKey};
use sec1::EcPrivateKey;
use serde::{Deserialize, Serialize};
use spki::EncodePublicKey;
use std::{ops::Deref, sync::Arc};
use strum::{Display, EnumString};

const PKCS8_PEM_LABEL: &str = "PRIVATE KEY";
const PKCS1_PEM_LABEL: &str = "RSA PRIVATE KEY";
const SEC1_PEM_LABEL: &str = "EC PRIVATE KEY";

/// Key algorithms a request can be generated for
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Algorithm {
    #[strum(serialize = "RSA-2048")]
    #[serde(rename = "RSA-2048")]
    Rsa2048,
    #[strum(serialize = "RSA-4096")]
    #[serde(rename = "RSA-4096")]
    Rsa4096,
    #[strum(serialize = "ECDSA-P256")]
    #[serde(rename = "ECDSA-P256")]
    EcdsaP256,
    #[strum(serialize = "ECDSA-P384")]
    #[serde(rename = "ECDSA-P384")]
    EcdsaP384,
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::EcdsaP256
    }
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Rsa2048,
        Algorithm::Rsa4096,
        Algorithm::EcdsaP256,
        Algorithm::EcdsaP384,
    ];

    /// Parses an algorithm name such as `ECDSA-P256`, ignoring case
    pub fn parse(name: &str) -> Result<Algorithm, CsrError> {
        name.trim().parse().map_err(|_| {
            CsrError::unsupported_algorithm(
                name,
                "expected one of RSA-2048, RSA-4096, ECDSA-P256, ECDSA-P384",
            )
        })
    }

    fn rsa_bits(self) -> Option<usize> {
        match self {
            Algorithm::Rsa2048 => Some(2048),
            Algorithm::Rsa4096 => Some(4096),
            Algorithm::EcdsaP256 | Algorithm::EcdsaP384 => None,
        }
    }
}

/// A private key together with its public half, for one supported algorithm
pub enum KeyPair {
    Rsa(RsaPrivateKey),
    P256(p256::ecdsa::SigningKey),
    P384(p384::ecdsa::SigningKey),
}

impl KeyPair {
    /// Generates a fresh key pair from the given secure random source
    pub fn generate<R: CryptoRng + RngCore>(
        algorithm: Algorithm,
        rng: &mut R,
    ) -> Result<KeyPair, CsrError> {
        match algorithm.rsa_bits() {
            Some(bits) => RsaPrivateKey::new(rng, bits)
                .map(KeyPair::Rsa)
                .map_err(|e| CsrError::KeyGenerationFailure {
                    algorithm: algorithm.to_string(),
                    source: Box::new(e),
                }),
            None if algorithm == Algorithm::EcdsaP256 => {
                Ok(KeyPair::P256(p256::ecdsa::SigningKey::random(rng)))
            }
            None => Ok(KeyPair::P384(p384::ecdsa::SigningKey::random(rng))),
        }
    }

    /// Decodes a PEM private key supplied by the caller. PKCS#8
    /// (`PRIVATE KEY`), PKCS#1 (`RSA PRIVATE KEY`) and SEC1
    /// (`EC PRIVATE KEY`) blocks are accepted.
    pub fn from_pem(pem: &str) -> Result<KeyPair, CsrError> {
        let (label, document) = SecretDocument::from_pem(pem).map_err(invalid_key)?;
        match label {
            PKCS8_PEM_LABEL => KeyPair::from_pkcs8(document.decode_msg().map_err(invalid_key)?),
            PKCS1_PEM_LABEL => {
                let key = RsaPrivateKey::from_pkcs1_der(document.as_bytes()).map_err(invalid_key)?;
                KeyPair::from_rsa(key)
            }
            SEC1_PEM_LABEL => KeyPair::from_sec1_der(document.as_bytes()),
            other => Err(CsrError::InvalidPrivateKey {
                reason: format!("unsupported PEM block {}", other),
            }),
        }
    }

    fn from_pkcs8(info: PrivateKeyInfo<'_>) -> Result<KeyPair, CsrError> {
        if info.algorithm.oid == RSA_ENCRYPTION {
            let key = RsaPrivateKey::try_from(info).map_err(invalid_key)?;
            return KeyPair::from_rsa(key);
        }

        if info.algorithm.oid == ID_EC_PUBLIC_KEY {
            let curve: ObjectIdentifier =
                info.algorithm.parameters_oid().map_err(invalid_key)?;
            if curve == SECP_256_R_1 {
                let key = p256::ecdsa::SigningKey::try_from(info).map_err(invalid_key)?;
                return Ok(KeyPair::P256(key));
            }
            if curve == SECP_384_R_1 {
                let key = p384::ecdsa::SigningKey::try_from(info).map_err(invalid_key)?;
                return Ok(KeyPair::P384(key));
            }
            return Err(unsupported_curve(curve));
        }

        Err(CsrError::unsupported_algorithm(
            info.algorithm.oid.to_string(),
            "supplied keys must be RSA or ECDSA",
        ))
    }

    fn from_rsa(key: RsaPrivateKey) -> Result<KeyPair, CsrError> {
        let bits = key.n().bits();
        if bits != 2048 && bits != 4096 {
            return Err(CsrError::unsupported_algorithm(
                format!("RSA-{}", bits),
                "supplied RSA keys must be 2048 or 4096 bits",
            ));
        }
        Ok(KeyPair::Rsa(key))
    }

    /// The curve comes from the ECPrivateKey parameters, or from the scalar
    /// length when they are omitted
    fn from_sec1_der(der: &[u8]) -> Result<KeyPair, CsrError> {
        let info = EcPrivateKey::from_der(der).map_err(invalid_key)?;
        let curve = match info.parameters.and_then(|params| params.named_curve()) {
            Some(curve) => curve,
            None if info.private_key.len() == 32 => SECP_256_R_1,
            None if info.private_key.len() == 48 => SECP_384_R_1,
            None => {
                return Err(CsrError::InvalidPrivateKey {
                    reason: "EC private key without curve parameters".to_string(),
                })
            }
        };

        if curve == SECP_256_R_1 {
            let key = p256::SecretKey::from_sec1_der(der).map_err(invalid_key)?;
            return Ok(KeyPair::P256(key.into()));
        }
        if curve == SECP_384_R_1 {
            let key = p384::SecretKey::from_sec1_der(der).map_err(invalid_key)?;
            return Ok(KeyPair::P384(key.into()));
        }
        Err(unsupported_curve(curve))
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            KeyPair::Rsa(key) if key.n().bits() >= 4096 => Algorithm::Rsa4096,
            KeyPair::Rsa(_) => Algorithm::Rsa2048,
            KeyPair::P256(_) => Algorithm::EcdsaP256,
            KeyPair::P384(_) => Algorithm::EcdsaP384,
        }
    }

    /// DER-encoded SubjectPublicKeyInfo of the public half
    pub fn public_key_der(&self) -> Result<Vec<u8>, CsrError> {
        let document = match self {
            KeyPair::Rsa(key) => key.to_public_key().to_public_key_der(),
            KeyPair::P256(key) => key.verifying_key().to_public_key_der(),
            KeyPair::P384(key) => key.verifying_key().to_public_key_der(),
        }
        .map_err(|e| CsrError::internal("encoding public key", e))?;
        Ok(document.as_bytes().to_vec())
    }

    /// PKCS#8 PEM encoding of the private half
    pub fn to_pkcs8_pem(&self) -> Result<String, CsrError> {
        let pem = match self {
            KeyPair::Rsa(key) => key.to_pkcs8_pem(LineEnding::LF),
            KeyPair::P256(key) => key.to_pkcs8_pem(LineEnding::LF),
            KeyPair::P384(key) => key.to_pkcs8_pem(LineEnding::LF),
        }
        .map_err(|e| CsrError::internal("encoding private key", e))?;
        Ok(pem.deref().clone())
    }
}

fn unsupported_curve(curve: ObjectIdentifier) -> CsrError {
    CsrError::unsupported_algorithm(
        format!("EC curve {}", curve),
        "supplied EC keys must use P-256 or P-384",
    )
}

fn invalid_key<E: std::fmt::Display>(e: E) -> CsrError {
    CsrError::InvalidPrivateKey {
        reason: e.to_string(),
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

/// Source of fresh key pairs
pub trait KeyPairGenerator: Send + Sync {
    fn generate(&self, algorithm: Algorithm) -> Result<KeyPair, CsrError>;
}

impl<U> KeyPairGenerator for Arc<U>
where
    U: KeyPairGenerator + ?Sized,
{
    fn generate(&self, algorithm: Algorithm) -> Result<KeyPair, CsrError> {
        self.deref().generate(algorithm)
    }
}

/// Generates key pairs from the operating system's secure random source
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRngKeyPairGenerator;

impl KeyPairGenerator for OsRngKeyPairGenerator {
    fn generate(&self, algorithm: Algorithm) -> Result<KeyPair, CsrError> {
        let mut rng = OsRng;

        // OsRng panics from fill_bytes, so an unavailable source is caught here
        let mut probe = [0u8; 32];
        rng.try_fill_bytes(&mut probe)
            .map_err(|source| CsrError::KeyGenerationFailure {
                algorithm: algorithm.to_string(),
                source: Box::new(source),
            })?;

        KeyPair::generate(algorithm, &mut rng)
    }
}
