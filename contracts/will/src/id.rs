use sha2::{Digest, Sha256};

use crate::error::ContractError;

const DOMAIN: &[u8] = b"will-id/v1";

/// Field separator. It is never escaped: fields containing it are rejected,
/// which keeps the encoding injective.
pub const DELIMITER: char = '\u{1f}';

/// Derive the id of a will from its defining fields.
///
/// `hex(sha256(DOMAIN ‖ 0x1F ‖ creator ‖ 0x1F ‖ name ‖ 0x1F ‖ beneficiary ‖ 0x1F ‖ height))`
/// with the height in decimal.
pub fn assign(
    creator: &str,
    name: &str,
    beneficiary: &str,
    maturity_height: u64,
) -> Result<String, ContractError> {
    for (field, value) in [
        ("creator", creator),
        ("name", name),
        ("beneficiary", beneficiary),
    ] {
        if value.is_empty() {
            return Err(ContractError::invalid(format!("{field} must not be empty")));
        }
        if value.contains(DELIMITER) {
            return Err(ContractError::invalid(format!(
                "{field} contains the reserved 0x1F separator"
            )));
        }
    }

    let height = maturity_height.to_string();
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN);
    for part in [
        creator.as_bytes(),
        name.as_bytes(),
        beneficiary.as_bytes(),
        height.as_bytes(),
    ] {
        hasher.update([DELIMITER as u8]);
        hasher.update(part);
    }
    Ok(hex::encode(hasher.finalize()))
}
