use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

const ED25519_DER_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];
const ECDSA_SECP256K1_DER_PREFIX: [u8; 14] = [
    0x30, 0x2d, 0x30, 0x07, 0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x0a, 0x03, 0x22, 0x00,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Ed25519,
    EcdsaSecp256k1,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyParseError {
    #[error("public key is not valid hex")]
    NotHex,

    #[error("public key has unsupported length {0} bytes")]
    UnsupportedLength(usize),

    #[error("public key has an unrecognised encoding")]
    UnrecognisedEncoding,
}

/// A public key in raw form, tagged with its algorithm.
///
/// Accepts hex strings (optionally `0x`-prefixed) in either raw form
/// (32-byte ED25519, 33-byte compressed secp256k1) or DER form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    algorithm: KeyAlgorithm,
    raw: Vec<u8>,
}

impl PublicKey {
    pub fn from_raw_ed25519(raw: [u8; 32]) -> Self {
        Self {
            algorithm: KeyAlgorithm::Ed25519,
            raw: raw.to_vec(),
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    pub fn to_bytes_raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn to_string_raw(&self) -> String {
        hex::encode(&self.raw)
    }

    pub fn to_string_der(&self) -> String {
        let prefix: &[u8] = match self.algorithm {
            KeyAlgorithm::Ed25519 => &ED25519_DER_PREFIX,
            KeyAlgorithm::EcdsaSecp256k1 => &ECDSA_SECP256K1_DER_PREFIX,
        };
        let mut der = prefix.to_vec();
        der.extend_from_slice(&self.raw);
        hex::encode(der)
    }

    fn from_bytes(bytes: Vec<u8>) -> Result<Self, KeyParseError> {
        match bytes.len() {
            32 => Ok(Self {
                algorithm: KeyAlgorithm::Ed25519,
                raw: bytes,
            }),
            33 if matches!(bytes[0], 0x02 | 0x03) => Ok(Self {
                algorithm: KeyAlgorithm::EcdsaSecp256k1,
                raw: bytes,
            }),
            44 if bytes.starts_with(&ED25519_DER_PREFIX) => Ok(Self {
                algorithm: KeyAlgorithm::Ed25519,
                raw: bytes[ED25519_DER_PREFIX.len()..].to_vec(),
            }),
            47 if bytes.starts_with(&ECDSA_SECP256K1_DER_PREFIX)
                && matches!(bytes[ECDSA_SECP256K1_DER_PREFIX.len()], 0x02 | 0x03) =>
            {
                Ok(Self {
                    algorithm: KeyAlgorithm::EcdsaSecp256k1,
                    raw: bytes[ECDSA_SECP256K1_DER_PREFIX.len()..].to_vec(),
                })
            }
            33 | 44 | 47 => Err(KeyParseError::UnrecognisedEncoding),
            n => Err(KeyParseError::UnsupportedLength(n)),
        }
    }
}

impl FromStr for PublicKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| KeyParseError::NotHex)?;
        Self::from_bytes(bytes)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_der())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
