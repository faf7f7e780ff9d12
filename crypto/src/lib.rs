//! Opal Coin Cryptography
//!
//! Keypairs and signature generation/verification over secp256k1.
//! Supports ECDSA (RFC 6979 deterministic) and BIP-340 style Schnorr.

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use k256::schnorr;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Invalid private key")]
    InvalidPrivateKey,
}

/// Signature scheme selector for signing operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureScheme {
    Ecdsa,
    Schnorr,
}

/// A signature payload tagged by scheme.
///
/// Decoded explicitly at the validation boundary; an unknown tag is a
/// deserialization error, not a silently skipped case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum Signature {
    Ecdsa { sig: String },
    Schnorr { r: String, s: String },
}

impl Signature {
    pub fn scheme(&self) -> SignatureScheme {
        match self {
            Signature::Ecdsa { .. } => SignatureScheme::Ecdsa,
            Signature::Schnorr { .. } => SignatureScheme::Schnorr,
        }
    }
}

/// Key pair for signing transactions
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate new random keypair
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let verifying_key = *signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Get public key as hex string (SEC1 compressed; doubles as the address)
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key.to_encoded_point(true).as_bytes())
    }

    /// Get private key as hex string
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Create keypair from private key hex
    pub fn from_private_key_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_str).map_err(|_| CryptoError::InvalidPrivateKey)?;

        let signing_key =
            SigningKey::from_slice(&bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let verifying_key = *signing_key.verifying_key();

        Ok(Self {
            signing_key,
            verifying_key,
        })
    }

    /// Sign a message under the given scheme, producing a tagged signature
    pub fn sign(&self, message: &[u8], scheme: SignatureScheme) -> Result<Signature, CryptoError> {
        match scheme {
            SignatureScheme::Ecdsa => {
                let sig: EcdsaSignature = self.signing_key.sign(message);
                Ok(Signature::Ecdsa {
                    sig: hex::encode(sig.to_bytes()),
                })
            }
            SignatureScheme::Schnorr => {
                let sk = schnorr::SigningKey::from_bytes(self.signing_key.to_bytes().as_slice())
                    .map_err(|_| CryptoError::InvalidPrivateKey)?;
                let sig: schnorr::Signature = sk.sign(message);
                let bytes = sig.to_bytes();
                Ok(Signature::Schnorr {
                    r: hex::encode(&bytes[..32]),
                    s: hex::encode(&bytes[32..]),
                })
            }
        }
    }
}

/// Verify an ECDSA signature against a SEC1-encoded public key.
///
/// A malformed public key is an error; a malformed or mismatched
/// signature verifies false.
pub fn ecdsa_verify(
    public_key_hex: &str,
    message: &[u8],
    sig_hex: &str,
) -> Result<bool, CryptoError> {
    let key_bytes = hex::decode(public_key_hex).map_err(|_| CryptoError::InvalidPublicKey)?;
    let verifying_key =
        VerifyingKey::from_sec1_bytes(&key_bytes).map_err(|_| CryptoError::InvalidPublicKey)?;

    let sig_bytes = match hex::decode(sig_hex) {
        Ok(bytes) => bytes,
        Err(_) => return Ok(false),
    };
    let sig = match EcdsaSignature::from_slice(&sig_bytes) {
        Ok(sig) => sig,
        Err(_) => return Ok(false),
    };

    Ok(verifying_key.verify(message, &sig).is_ok())
}

/// Verify a Schnorr signature (r, s hex halves) against a public key.
///
/// Accepts either a SEC1 compressed key or a bare 32-byte x-only key.
pub fn schnorr_verify(
    public_key_hex: &str,
    message: &[u8],
    r_hex: &str,
    s_hex: &str,
) -> Result<bool, CryptoError> {
    let key_bytes = hex::decode(public_key_hex).map_err(|_| CryptoError::InvalidPublicKey)?;
    let x_only = match key_bytes.len() {
        33 => &key_bytes[1..],
        32 => &key_bytes[..],
        _ => return Err(CryptoError::InvalidPublicKey),
    };
    let verifying_key =
        schnorr::VerifyingKey::from_bytes(x_only).map_err(|_| CryptoError::InvalidPublicKey)?;

    let mut sig_bytes = match hex::decode(r_hex) {
        Ok(bytes) => bytes,
        Err(_) => return Ok(false),
    };
    match hex::decode(s_hex) {
        Ok(bytes) => sig_bytes.extend(bytes),
        Err(_) => return Ok(false),
    }
    let sig = match schnorr::Signature::try_from(sig_bytes.as_slice()) {
        Ok(sig) => sig,
        Err(_) => return Ok(false),
    };

    Ok(verifying_key.verify(message, &sig).is_ok())
}

/// Hash data with SHA256
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Hash data and return as hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Double SHA256
pub fn sha256d(data: &[u8]) -> Vec<u8> {
    sha256(&sha256(data))
}
