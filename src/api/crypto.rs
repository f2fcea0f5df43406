//! Exchange credential encryption
//!
//! Credentials are sealed with the backend's RSA public key (OAEP, SHA-1
//! digest and MGF1-SHA-1) and sent base64-encoded. Only the ciphertext leaves
//! the process.

use crate::trade::ExchangeCredentials;
use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Oaep, RsaPublicKey};
use sha1::Sha1;

/// Parse an SPKI (`PUBLIC KEY`) or PKCS#1 (`RSA PUBLIC KEY`) PEM
pub fn parse_public_key(pem: &str) -> Result<RsaPublicKey> {
    let pem = pem.trim();
    if pem.contains("BEGIN RSA PUBLIC KEY") {
        RsaPublicKey::from_pkcs1_pem(pem)
            .map_err(|e| Error::Encryption(format!("Invalid PKCS#1 public key: {}", e)))
    } else {
        RsaPublicKey::from_public_key_pem(pem)
            .map_err(|e| Error::Encryption(format!("Invalid public key: {}", e)))
    }
}

/// Encrypt `{apiKey, secret, password}` for transmission
pub fn encrypt_credentials(pem: &str, credentials: &ExchangeCredentials) -> Result<String> {
    let key = parse_public_key(pem)?;
    let plaintext = credentials.wire_json().to_string();

    let mut rng = rand::thread_rng();
    let sealed = key
        .encrypt(&mut rng, Oaep::new::<Sha1>(), plaintext.as_bytes())
        .map_err(|e| Error::Encryption(format!("RSA-OAEP encryption failed: {}", e)))?;

    Ok(STANDARD.encode(sealed))
}
