use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::Binary;

use crate::state::{ComponentKind, Will};

#[cw_serde]
pub struct InstantiateMsg {
    /// Defaults to 10
    pub max_wills_per_height: Option<u32>,
    /// Defaults to 100 seconds
    pub ibc_packet_timeout_seconds: Option<u64>,
}

/// A component as submitted at creation; it always starts `Pending`.
#[cw_serde]
pub struct ComponentMsg {
    pub id: String,
    pub name: String,
    pub kind: ComponentKind,
}

/// Evidence submitted with a claim.
#[cw_serde]
pub enum ClaimProof {
    /// Hex-encoded compressed public key and 64-byte `R ‖ S` signature
    Schnorr {
        public_key: String,
        signature: String,
        message: Binary,
    },
    /// `commitment` is the claimed commitment; the other fields are carried
    /// for the claimant's records and are not checked
    Pedersen {
        commitment: Binary,
        blinding_factor: Binary,
        value: Binary,
    },
    /// Reserved for SNARK proofs; always rejected
    Gnark {
        proof: Binary,
        public_inputs: Binary,
    },
}

impl ClaimProof {
    pub fn scheme(&self) -> &'static str {
        match self {
            ClaimProof::Schnorr { .. } => "schnorr",
            ClaimProof::Pedersen { .. } => "pedersen",
            ClaimProof::Gnark { .. } => "gnark",
        }
    }
}

#[cw_serde]
pub struct CreateWillRequest {
    pub creator: String,
    pub name: String,
    pub beneficiary: String,
    pub maturity_height: u64,
    pub components: Vec<ComponentMsg>,
}

#[cw_serde]
pub struct ClaimRequest {
    pub claimer: String,
    pub will_id: String,
    pub component_id: String,
    pub proof: ClaimProof,
}

#[cw_serde]
pub enum ExecuteMsg {
    /// Lock a will; attached funds must cover its transfers exactly
    CreateWill {
        name: String,
        beneficiary: String,
        maturity_height: u64,
        components: Vec<ComponentMsg>,
    },
    /// Claim an active component (beneficiary only)
    Claim {
        will_id: String,
        component_id: String,
        proof: ClaimProof,
    },
}

/// Privileged calls made by the chain itself.
#[cw_serde]
pub enum SudoMsg {
    /// Process wills maturing at the current block height
    BeginBlock {},
    UpdateConfig {
        max_wills_per_height: Option<u32>,
        ibc_packet_timeout_seconds: Option<u64>,
    },
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    #[returns(ConfigResponse)]
    Config {},

    #[returns(WillResponse)]
    GetWillById { id: String },

    /// Wills created by `address`
    #[returns(WillsResponse)]
    ListWillsByAddress { address: String },

    /// Ids maturing at `height`, in processing order
    #[returns(WillIdsResponse)]
    WillsAtHeight { height: u64 },
}

// Response types

#[cw_serde]
pub struct ConfigResponse {
    pub max_wills_per_height: u32,
    pub ibc_packet_timeout_seconds: u64,
}

#[cw_serde]
pub struct WillResponse {
    pub will: Will,
}

#[cw_serde]
pub struct WillsResponse {
    pub wills: Vec<Will>,
    /// Index entries whose record could not be read
    pub skipped: u32,
}

#[cw_serde]
pub struct WillIdsResponse {
    pub height: u64,
    pub ids: Vec<String>,
}
