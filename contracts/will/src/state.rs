use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Binary, Coin};
use cw_storage_plus::{Item, Map};

use crate::error::ContractError;

pub const DEFAULT_MAX_WILLS_PER_HEIGHT: u32 = 10;
pub const DEFAULT_IBC_PACKET_TIMEOUT_SECONDS: u64 = 100;

#[cw_serde]
pub enum WillStatus {
    /// Waiting for its maturity height
    Live,
    /// Processed by the scheduler (terminal)
    Expired,
}

#[cw_serde]
pub enum ComponentStatus {
    Pending,
    Active,
    Executed,
    Claimed,
}

impl ComponentStatus {
    /// Forward-only transitions. Which of them applies depends on the
    /// component kind; see [`ComponentKind::matured_status`].
    pub fn can_advance_to(&self, next: &ComponentStatus) -> bool {
        matches!(
            (self, next),
            (ComponentStatus::Pending, ComponentStatus::Executed)
                | (ComponentStatus::Pending, ComponentStatus::Active)
                | (ComponentStatus::Active, ComponentStatus::Claimed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentStatus::Pending => "pending",
            ComponentStatus::Active => "active",
            ComponentStatus::Executed => "executed",
            ComponentStatus::Claimed => "claimed",
        }
    }
}

/// What a beneficiary must prove to release a `Claim` component.
#[cw_serde]
pub enum ClaimRequirement {
    /// Hex-encoded compressed secp256k1 public key the claim must be signed with
    Schnorr { public_key: String },
    /// Compressed points; the claimed commitment must satisfy
    /// `commitment + claimed == target_commitment`
    Pedersen {
        commitment: Binary,
        target_commitment: Binary,
    },
}

impl ClaimRequirement {
    pub fn scheme(&self) -> &'static str {
        match self {
            ClaimRequirement::Schnorr { .. } => "schnorr",
            ClaimRequirement::Pedersen { .. } => "pedersen",
        }
    }
}

#[cw_serde]
pub enum ComponentKind {
    /// Move `amount` from the will's creator to `to`
    Transfer { to: String, amount: Coin },
    /// Becomes claimable once the will matures
    Claim { requirement: ClaimRequirement },
    /// Execute `payload` on the contract at `address`
    Contract { address: String, payload: Binary },
    /// Send `payload` over a cross-chain channel
    CrossChainMessage {
        channel: String,
        port: String,
        payload: Binary,
    },
}

impl ComponentKind {
    /// Status a component reaches when its will matures and the
    /// associated effect succeeds.
    pub fn matured_status(&self) -> ComponentStatus {
        match self {
            ComponentKind::Claim { .. } => ComponentStatus::Active,
            _ => ComponentStatus::Executed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Transfer { .. } => "transfer",
            ComponentKind::Claim { .. } => "claim",
            ComponentKind::Contract { .. } => "contract",
            ComponentKind::CrossChainMessage { .. } => "cross_chain_message",
        }
    }
}

#[cw_serde]
pub struct ExecutionComponent {
    pub id: String,
    pub name: String,
    pub status: ComponentStatus,
    pub kind: ComponentKind,
}

impl ExecutionComponent {
    pub fn advance(&mut self, next: ComponentStatus) -> Result<(), ContractError> {
        if !self.status.can_advance_to(&next) {
            return Err(ContractError::invalid(format!(
                "component {} cannot move from {} to {}",
                self.id,
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        Ok(())
    }
}

#[cw_serde]
pub struct Will {
    /// Derived from (creator, name, beneficiary, maturity_height)
    pub id: String,
    pub creator: String,
    pub name: String,
    pub beneficiary: String,
    /// Block height at which the components become due
    pub maturity_height: u64,
    pub status: WillStatus,
    /// Executed in this order
    pub components: Vec<ExecutionComponent>,
}

impl Will {
    pub fn component_index(&self, component_id: &str) -> Option<usize> {
        self.components.iter().position(|c| c.id == component_id)
    }
}

#[cw_serde]
pub struct Config {
    /// Cap on wills sharing one maturity height
    pub max_wills_per_height: u32,
    /// Relative timeout for cross-chain packets
    pub ibc_packet_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_wills_per_height: DEFAULT_MAX_WILLS_PER_HEIGHT,
            ibc_packet_timeout_seconds: DEFAULT_IBC_PACKET_TIMEOUT_SECONDS,
        }
    }
}

pub const CONFIG: Item<Config> = Item::new("config");

/// Component waiting on the reply to its submessage.
#[cw_serde]
pub struct PendingEffect {
    pub will_id: String,
    pub component_id: String,
}

/// First reply id not yet handed out. Starts at 1.
pub const NEXT_REPLY_ID: Item<u64> = Item::new("next_reply_id");
pub const PENDING_EFFECTS: Map<u64, PendingEffect> = Map::new("pending_effects");
