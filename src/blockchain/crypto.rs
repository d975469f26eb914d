use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use std::fmt;

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),
}

/// A ledger address.
///
/// Wallet addresses are the base58 form of an ed25519 public key, but the
/// ledger itself treats addresses as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Address(pub String);

impl Address {
    /// Derives the address owned by a public key
    pub fn from_public_key(public_key: &VerifyingKey) -> Self {
        Address(bs58::encode(public_key.as_bytes()).into_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Address(value.to_string())
    }
}

/// Represents a digital signature (base58 encoded)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DigitalSignature(pub String);

impl DigitalSignature {
    pub fn from_signature(signature: &Signature) -> Self {
        DigitalSignature(bs58::encode(signature.to_bytes()).into_string())
    }

    pub fn to_signature(&self) -> Result<Signature, CryptoError> {
        let bytes = bs58::decode(&self.0)
            .into_vec()
            .map_err(|e| CryptoError::DecodingError(e.to_string()))?;

        let signature_bytes: [u8; 64] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidSignature("Invalid signature length".to_string())
        })?;

        Ok(Signature::from_bytes(&signature_bytes))
    }
}

/// Parses a public key from its 64-character hex form
pub fn public_key_from_hex(encoded: &str) -> Result<VerifyingKey, CryptoError> {
    let bytes = hex::decode(encoded).map_err(|e| CryptoError::DecodingError(e.to_string()))?;

    let key_bytes: [u8; 32] = bytes.try_into().map_err(|_| {
        CryptoError::InvalidPublicKey("Public key must be 32 bytes".to_string())
    })?;

    VerifyingKey::from_bytes(&key_bytes).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
}

pub fn public_key_to_hex(public_key: &VerifyingKey) -> String {
    hex::encode(public_key.as_bytes())
}

/// Represents a wallet with a keypair
#[derive(Debug, Clone)]
pub struct Wallet {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    address: Address,
}

impl Wallet {
    /// Creates a new wallet with a random keypair
    pub fn new() -> Self {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        Self::from_signing_key(signing_key)
    }

    /// Creates a wallet from an existing secret key
    pub fn from_secret_key(secret_key_bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes_array: [u8; 32] = secret_key_bytes.try_into().map_err(|_| {
            CryptoError::InvalidPrivateKey("Invalid private key length".to_string())
        })?;

        Ok(Self::from_signing_key(SigningKey::from_bytes(&bytes_array)))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = VerifyingKey::from(&signing_key);
        let address = Address::from_public_key(&verifying_key);

        Wallet {
            signing_key,
            verifying_key,
            address,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn public_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    pub fn public_key_hex(&self) -> String {
        public_key_to_hex(&self.verifying_key)
    }

    /// Signs a message (normally a transaction digest) with the wallet's private key
    pub fn sign(&self, message: &[u8]) -> DigitalSignature {
        DigitalSignature::from_signature(&self.signing_key.sign(message))
    }

    /// Exports the wallet's secret key as bytes
    pub fn export_secret_key(&self) -> Vec<u8> {
        self.signing_key.to_bytes().to_vec()
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

/// Verifies a signature over a digest.
///
/// A signature that cannot be decoded is reported as an error; a well-formed
/// signature that does not match yields `Ok(false)`.
pub fn verify_signature(
    public_key: &VerifyingKey,
    digest: &[u8],
    signature: &DigitalSignature,
) -> Result<bool, CryptoError> {
    let signature = signature.to_signature()?;
    Ok(public_key.verify(digest, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_creation() {
        let wallet = Wallet::new();
        assert!(!wallet.address().0.is_empty());
        assert_eq!(wallet.public_key_hex().len(), 64);
    }

    #[test]
    fn test_signing_and_verification() {
        let wallet = Wallet::new();
        let digest = b"0123456789abcdef0123456789abcdef";

        let signature = wallet.sign(digest);
        assert!(verify_signature(wallet.public_key(), digest, &signature).unwrap());

        let wrong_digest = b"fedcba9876543210fedcba9876543210";
        assert!(!verify_signature(wallet.public_key(), wrong_digest, &signature).unwrap());

        let other = Wallet::new();
        assert!(!verify_signature(other.public_key(), digest, &signature).unwrap());
    }

    #[test]
    fn test_garbled_signature_is_an_error() {
        let wallet = Wallet::new();
        let result = verify_signature(wallet.public_key(), b"digest", &DigitalSignature("0OIl".into()));
        assert!(result.is_err());

        let short = DigitalSignature(bs58::encode([1u8; 10]).into_string());
        assert!(matches!(
            verify_signature(wallet.public_key(), b"digest", &short),
            Err(CryptoError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_public_key_hex_parsing() {
        let wallet = Wallet::new();
        let parsed = public_key_from_hex(&wallet.public_key_hex()).unwrap();
        assert_eq!(Address::from_public_key(&parsed), *wallet.address());

        assert!(public_key_from_hex("abcd").is_err());
        assert!(public_key_from_hex("not hex").is_err());
    }

    #[test]
    fn test_wallet_from_secret_key() {
        let wallet = Wallet::new();
        let restored = Wallet::from_secret_key(&wallet.export_secret_key()).unwrap();
        assert_eq!(restored.address(), wallet.address());

        assert!(Wallet::from_secret_key(&[0u8; 3]).is_err());
    }
}
