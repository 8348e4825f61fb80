pub mod pedersen;
pub mod schnorr;

use secp256k1::{All, Secp256k1};

use crate::error::ContractError;
use crate::msg::ClaimProof;
use crate::state::ClaimRequirement;

/// Checks a submitted proof against the requirement stored on a `Claim`
/// component. Holds one curve context, built once and borrowed by callers.
pub struct ClaimVerifier {
    secp: Secp256k1<All>,
}

impl Default for ClaimVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimVerifier {
    pub fn new() -> Self {
        ClaimVerifier {
            secp: Secp256k1::new(),
        }
    }

    pub fn secp(&self) -> &Secp256k1<All> {
        &self.secp
    }

    pub fn verify(
        &self,
        requirement: &ClaimRequirement,
        proof: &ClaimProof,
    ) -> Result<(), ContractError> {
        match proof {
            ClaimProof::Schnorr {
                public_key,
                signature,
                message,
            } => {
                let ClaimRequirement::Schnorr {
                    public_key: expected,
                } = requirement
                else {
                    return Err(scheme_mismatch(requirement, proof));
                };
                let key = decode_hex("public key", public_key)?;
                if key != decode_hex("stored public key", expected)? {
                    return Err(ContractError::verification(
                        "public key does not match the will",
                    ));
                }
                let signature = decode_hex("signature", signature)?;
                schnorr::verify(&self.secp, &key, &signature, message.as_slice())
            }
            ClaimProof::Pedersen { commitment, .. } => {
                let ClaimRequirement::Pedersen {
                    commitment: stored,
                    target_commitment,
                } = requirement
                else {
                    return Err(scheme_mismatch(requirement, proof));
                };
                pedersen::verify(
                    stored.as_slice(),
                    commitment.as_slice(),
                    target_commitment.as_slice(),
                )
            }
            ClaimProof::Gnark { .. } => Err(ContractError::UnsupportedProofKind(
                proof.scheme().to_string(),
            )),
        }
    }
}

fn decode_hex(what: &str, value: &str) -> Result<Vec<u8>, ContractError> {
    hex::decode(value).map_err(|e| ContractError::verification(format!("{what}: {e}")))
}

fn scheme_mismatch(requirement: &ClaimRequirement, proof: &ClaimProof) -> ContractError {
    ContractError::verification(format!(
        "{} proof submitted for a {} requirement",
        proof.scheme(),
        requirement.scheme()
    ))
}
