//! Login challenge and signature checks

use crate::{Error, Result};
use alloy::primitives::Signature;
use rand::RngCore;

/// Fresh 32-byte random challenge as lowercase hex
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    alloy::hex::encode(bytes)
}

/// Recover the lowercase address that produced an EIP-191 signature
pub fn recover_signer(message: &str, signature_hex: &str) -> Result<String> {
    let raw = signature_hex.strip_prefix("0x").unwrap_or(signature_hex);
    let bytes = alloy::hex::decode(raw)
        .map_err(|e| Error::SignatureInvalid(format!("not hex: {}", e)))?;
    let signature = Signature::try_from(bytes.as_slice())
        .map_err(|e| Error::SignatureInvalid(e.to_string()))?;
    let address = signature
        .recover_address_from_msg(message.as_bytes())
        .map_err(|e| Error::SignatureInvalid(e.to_string()))?;
    Ok(address.to_string().to_lowercase())
}

/// Check that `signature_hex` over `message` was made by `expected`.
/// Address comparison ignores case.
pub fn verify_signature(message: &str, signature_hex: &str, expected: &str) -> Result<()> {
    let recovered = recover_signer(message, signature_hex)?;
    if recovered.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        tracing::warn!(%recovered, %expected, "Signature does not match wallet address");
        Err(Error::SignatureInvalid(format!(
            "signed by {} instead of {}",
            recovered, expected
        )))
    }
}
