//! Schnorr proofs over secp256k1.
//!
//! A signature is `R ‖ S`: the x-only nonce point (even y implied) followed
//! by the 32-byte scalar. It verifies when `S·G == R + c·P` with
//! `c = sha256(message ‖ hex(public_key))` read as a scalar.

use secp256k1::{All, Parity, PublicKey, Scalar, Secp256k1, SecretKey, XOnlyPublicKey};
use sha2::{Digest, Sha256};

use crate::error::ContractError;

pub const SIGNATURE_LEN: usize = 64;

const NONCE_TAG: &[u8] = b"will/schnorr-nonce";

/// Map `message ‖ hex(public_key)` into the scalar field. Digests at or
/// above the group order are re-hashed with a counter byte appended.
pub fn challenge(message: &[u8], public_key: &[u8]) -> Result<Scalar, ContractError> {
    let key_hex = hex::encode(public_key);
    for counter in 0..=u8::MAX {
        let mut hasher = Sha256::new();
        hasher.update(message);
        hasher.update(key_hex.as_bytes());
        if counter > 0 {
            hasher.update([counter]);
        }
        let digest: [u8; 32] = hasher.finalize().into();
        if let Ok(scalar) = Scalar::from_be_bytes(digest) {
            return Ok(scalar);
        }
    }
    Err(ContractError::verification("challenge out of range"))
}

pub fn verify(
    secp: &Secp256k1<All>,
    public_key: &[u8],
    signature: &[u8],
    message: &[u8],
) -> Result<(), ContractError> {
    let point = PublicKey::from_slice(public_key)
        .map_err(|e| ContractError::verification(format!("public key: {e}")))?;

    if signature.is_empty() || signature.len() % 2 != 0 {
        return Err(ContractError::verification(
            "signature must be two equal-length halves",
        ));
    }
    let (r_bytes, s_bytes) = signature.split_at(signature.len() / 2);

    let r = XOnlyPublicKey::from_slice(r_bytes)
        .map_err(|e| ContractError::verification(format!("signature R: {e}")))?;
    let r = PublicKey::from_x_only_public_key(r, Parity::Even);
    let s = SecretKey::from_slice(s_bytes)
        .map_err(|e| ContractError::verification(format!("signature S: {e}")))?;

    let c = challenge(message, public_key)?;

    let lhs = PublicKey::from_secret_key(secp, &s);
    let rhs = point
        .mul_tweak(secp, &c)
        .and_then(|cp| r.combine(&cp))
        .map_err(|e| ContractError::verification(format!("R + c·P: {e}")))?;

    if lhs != rhs {
        return Err(ContractError::verification("schnorr signature mismatch"));
    }
    Ok(())
}

/// Produce a signature accepted by [`verify`] for the compressed encoding
/// of `secret`'s public key. The nonce is derived from the key and message.
pub fn sign(
    secp: &Secp256k1<All>,
    secret: &SecretKey,
    message: &[u8],
) -> Result<[u8; SIGNATURE_LEN], ContractError> {
    let public_key = PublicKey::from_secret_key(secp, secret).serialize();

    let mut hasher = Sha256::new();
    hasher.update(NONCE_TAG);
    hasher.update(secret.secret_bytes());
    hasher.update(message);
    let nonce = SecretKey::from_slice(&hasher.finalize())
        .map_err(|e| ContractError::invalid(format!("nonce: {e}")))?;

    let (r, parity) = nonce.x_only_public_key(secp);
    let nonce = if parity == Parity::Odd {
        nonce.negate()
    } else {
        nonce
    };

    let c = challenge(message, &public_key)?;
    let cx = secret
        .mul_tweak(&c)
        .map_err(|e| ContractError::invalid(format!("c·x: {e}")))?;
    let cx = Scalar::from_be_bytes(cx.secret_bytes())
        .map_err(|_| ContractError::invalid("c·x out of range"))?;
    let s = nonce
        .add_tweak(&cx)
        .map_err(|e| ContractError::invalid(format!("k + c·x: {e}")))?;

    let mut sig = [0u8; SIGNATURE_LEN];
    sig[..32].copy_from_slice(&r.serialize());
    sig[32..].copy_from_slice(&s.secret_bytes());
    Ok(sig)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> SecretKey {
        SecretKey::from_slice(&[byte; 32]).unwrap()
    }

    #[test]
    fn sign_then_verify() {
        let secp = Secp256k1::new();
        let sk = key(7);
        let pk = PublicKey::from_secret_key(&secp, &sk).serialize();
        let sig = sign(&secp, &sk, b"to my heirs").unwrap();
        verify(&secp, &pk, &sig, b"to my heirs").unwrap();
    }

    #[test]
    fn wrong_message_or_key_fails() {
        let secp = Secp256k1::new();
        let sk = key(7);
        let pk = PublicKey::from_secret_key(&secp, &sk).serialize();
        let sig = sign(&secp, &sk, b"to my heirs").unwrap();

        assert!(verify(&secp, &pk, &sig, b"to my heir").is_err());

        let other = PublicKey::from_secret_key(&secp, &key(8)).serialize();
        assert!(verify(&secp, &other, &sig, b"to my heirs").is_err());
    }

    #[test]
    fn every_single_bit_flip_is_rejected() {
        let secp = Secp256k1::new();
        let sk = key(3);
        let pk = PublicKey::from_secret_key(&secp, &sk).serialize();
        let sig = sign(&secp, &sk, b"m").unwrap();

        for bit in 0..SIGNATURE_LEN * 8 {
            let mut tampered = sig;
            tampered[bit / 8] ^= 1 << (bit % 8);
            let err = verify(&secp, &pk, &tampered, b"m").unwrap_err();
            assert!(matches!(err, ContractError::VerificationFailed(_)), "bit {bit}");
        }
    }

    #[test]
    fn malformed_inputs_fail_without_panicking() {
        let secp = Secp256k1::new();
        let pk = PublicKey::from_secret_key(&secp, &key(1)).serialize();

        for sig in [vec![], vec![0u8; 1], vec![0u8; 63], vec![0xffu8; 64], vec![1u8; 200]] {
            let err = verify(&secp, &pk, &sig, b"m").unwrap_err();
            assert!(matches!(err, ContractError::VerificationFailed(_)));
        }
        for bad_key in [vec![], vec![2u8; 33], vec![9u8; 5]] {
            let err = verify(&secp, &bad_key, &[1u8; 64], b"m").unwrap_err();
            assert!(matches!(err, ContractError::VerificationFailed(_)));
        }
    }

    #[test]
    fn challenge_binds_the_public_key() {
        let a = challenge(b"m", &[2u8; 33]).unwrap();
        let b = challenge(b"m", &[3u8; 33]).unwrap();
        assert_ne!(a.to_be_bytes(), b.to_be_bytes());
    }
}
