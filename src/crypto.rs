//! Cryptographic identity: key pairs, signatures and addresses

use crate::error::CryptoError;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE, SECRET_KEY_SIZE},
    ecdsa, All, Message, PublicKey, Secp256k1, SecretKey,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Length of a compressed public key.
pub const PUBLIC_KEY_LEN: usize = PUBLIC_KEY_SIZE;
/// Length of a compact signature.
pub const SIGNATURE_LEN: usize = COMPACT_SIGNATURE_SIZE;
/// Length of a key seed (the raw secret scalar).
pub const SEED_LEN: usize = SECRET_KEY_SIZE;
/// Length of an address.
pub const ADDRESS_LEN: usize = 20;

/// Payee reference derived from a public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// Derives the address of a public key: the last 20 bytes of its SHA-256 hash.
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let digest: [u8; 32] = Sha256::digest(public_key).into();
        let mut address = [0u8; ADDRESS_LEN];
        address.copy_from_slice(&digest[32 - ADDRESS_LEN..]);
        Address(address)
    }

    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// A compact ECDSA signature. Carries no reference to its signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl Signature {
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Signature)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Verifies this signature against `public_key` and `message`.
    pub fn verify(&self, public_key: &[u8], message: &[u8]) -> bool {
        verify(&self.0, public_key, message)
    }
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    /// Creates a KeyPair from an existing SecretKey.
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Deterministically derives a KeyPair from a 32 byte seed.
    pub fn from_seed(seed: &[u8]) -> Result<Self, CryptoError> {
        if seed.len() != SEED_LEN {
            return Err(CryptoError::InvalidSeedLength {
                expected: SEED_LEN,
                got: seed.len(),
            });
        }
        let secret_key = SecretKey::from_slice(seed)
            .map_err(|e| CryptoError::InvalidSecretKey(e.to_string()))?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Returns the KeyPair's public key as a compressed byte array.
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.public_key.serialize()
    }

    pub fn address(&self) -> Address {
        Address::from_public_key(&self.public_key_bytes())
    }

    /// Signs the SHA-256 digest of `message`.
    pub fn sign(&self, message: &[u8]) -> Signature {
        let signature = SECP256K1_CONTEXT.sign_ecdsa(&digest_message(message), &self.secret_key);
        Signature(signature.serialize_compact())
    }
}

fn digest_message(message: &[u8]) -> Message {
    Message::from_digest(Sha256::digest(message).into())
}

pub fn generate_keypair() -> KeyPair {
    KeyPair::generate()
}

pub fn keypair_from_seed(seed: &[u8]) -> Result<KeyPair, CryptoError> {
    KeyPair::from_seed(seed)
}

pub fn public_key(keypair: &KeyPair) -> [u8; PUBLIC_KEY_LEN] {
    keypair.public_key_bytes()
}

pub fn sign(keypair: &KeyPair, message: &[u8]) -> Signature {
    keypair.sign(message)
}

/// Verifies a compact signature over `message` against raw public key bytes.
///
/// Never fails loudly: malformed keys or signatures, including wrong lengths,
/// simply yield `false`.
pub fn verify(signature: &[u8], public_key: &[u8], message: &[u8]) -> bool {
    if public_key.len() != PUBLIC_KEY_LEN || signature.len() != SIGNATURE_LEN {
        return false;
    }
    let Ok(public_key) = PublicKey::from_slice(public_key) else {
        return false;
    };
    let Ok(signature) = ecdsa::Signature::from_compact(signature) else {
        return false;
    };
    SECP256K1_CONTEXT
        .verify_ecdsa(&digest_message(message), &signature, &public_key)
        .is_ok()
}

pub fn address_of(public_key: &[u8]) -> Address {
    Address::from_public_key(public_key)
}
