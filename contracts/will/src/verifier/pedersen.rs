//! Pedersen commitment checks over secp256k1.
//!
//! Verification is pure group arithmetic: the stored commitment plus the
//! claimed one must equal the target. It shows the claimant holds a
//! commitment that completes the sum; it is not a range or membership proof.

use secp256k1::{All, Parity, PublicKey, Scalar, Secp256k1, SecretKey, XOnlyPublicKey};
use sha2::{Digest, Sha256};

use crate::error::ContractError;

const GENERATOR_TAG: &[u8] = b"will/pedersen-h";

pub fn parse_point(bytes: &[u8]) -> Result<PublicKey, secp256k1::Error> {
    PublicKey::from_slice(bytes)
}

/// Check `stored + claimed == target`.
pub fn verify(stored: &[u8], claimed: &[u8], target: &[u8]) -> Result<(), ContractError> {
    let stored = parse_point(stored)
        .map_err(|e| ContractError::verification(format!("stored commitment: {e}")))?;
    let claimed = parse_point(claimed)
        .map_err(|e| ContractError::verification(format!("claimed commitment: {e}")))?;
    let target = parse_point(target)
        .map_err(|e| ContractError::verification(format!("target commitment: {e}")))?;

    let sum = stored
        .combine(&claimed)
        .map_err(|e| ContractError::verification(format!("commitment sum: {e}")))?;
    if sum != target {
        return Err(ContractError::verification(
            "commitment sum does not match target",
        ));
    }
    Ok(())
}

/// Second generator with no known discrete log relative to G: the first
/// valid x-coordinate in `sha256(tag ‖ counter)`, taken with even y.
pub fn generator_h() -> PublicKey {
    let mut counter: u32 = 0;
    loop {
        let mut hasher = Sha256::new();
        hasher.update(GENERATOR_TAG);
        hasher.update(counter.to_be_bytes());
        if let Ok(x) = XOnlyPublicKey::from_slice(&hasher.finalize()) {
            return PublicKey::from_x_only_public_key(x, Parity::Even);
        }
        counter += 1;
    }
}

/// `value·G + blinding·H`
pub fn commit(
    secp: &Secp256k1<All>,
    value: &SecretKey,
    blinding: &SecretKey,
) -> Result<PublicKey, ContractError> {
    let blinding = Scalar::from_be_bytes(blinding.secret_bytes())
        .map_err(|_| ContractError::invalid("blinding factor out of range"))?;
    let value_point = PublicKey::from_secret_key(secp, value);
    generator_h()
        .mul_tweak(secp, &blinding)
        .and_then(|rh| value_point.combine(&rh))
        .map_err(|e| ContractError::invalid(format!("commitment: {e}")))
}
