use std::collections::HashSet;

use cosmwasm_std::Storage;

use crate::error::ContractError;
use crate::host::HeightClock;
use crate::id;
use crate::msg::{ClaimRequest, ComponentMsg, CreateWillRequest};
use crate::repository::{WillRepository, WillsByCreator};
use crate::state::{
    ClaimRequirement, ComponentKind, ComponentStatus, ExecutionComponent, Will, WillStatus,
};
use crate::verifier::{pedersen, ClaimVerifier};

/// Compressed SEC1 point length.
const POINT_LEN: usize = 33;

/// Creation, lookup and claim of wills. Maturity processing lives in
/// [`crate::scheduler::MaturityScheduler`].
pub struct WillLifecycleManager<'v> {
    repo: WillRepository,
    verifier: &'v ClaimVerifier,
}

impl<'v> WillLifecycleManager<'v> {
    pub fn new(repo: WillRepository, verifier: &'v ClaimVerifier) -> Self {
        WillLifecycleManager { repo, verifier }
    }

    /// Validate the request, derive the id and persist a `Live` will with
    /// every component `Pending`. Nothing is written on error.
    pub fn create_will(
        &self,
        store: &mut dyn Storage,
        clock: &dyn HeightClock,
        request: CreateWillRequest,
    ) -> Result<Will, ContractError> {
        let current = clock.current_height();
        if request.maturity_height <= current {
            return Err(ContractError::invalid(format!(
                "maturity height {} must be above the current height {current}",
                request.maturity_height
            )));
        }
        self.validate_components(&request.components)?;

        let id = id::assign(
            &request.creator,
            &request.name,
            &request.beneficiary,
            request.maturity_height,
        )?;
        if self.repo.exists(store, &id) {
            return Err(ContractError::AlreadyExists { id });
        }

        let will = Will {
            id,
            creator: request.creator,
            name: request.name,
            beneficiary: request.beneficiary,
            maturity_height: request.maturity_height,
            status: WillStatus::Live,
            components: request
                .components
                .into_iter()
                .map(|c| ExecutionComponent {
                    id: c.id,
                    name: c.name,
                    status: ComponentStatus::Pending,
                    kind: c.kind,
                })
                .collect(),
        };
        self.repo.put(store, &will)?;
        Ok(will)
    }

    pub fn get_will_by_id(&self, store: &dyn Storage, id: &str) -> Result<Will, ContractError> {
        self.repo.get(store, id)
    }

    /// Wills created by `address`; unreadable records are skipped and counted.
    pub fn list_wills_by_address<'s>(
        &self,
        store: &'s dyn Storage,
        address: &str,
    ) -> Result<WillsByCreator<'s>, ContractError> {
        Ok(self.repo.list_by_creator(store, address)?)
    }

    /// Release an `Active` claim component to the beneficiary. The will is
    /// only written after the proof verifies.
    pub fn claim(
        &self,
        store: &mut dyn Storage,
        request: &ClaimRequest,
    ) -> Result<Will, ContractError> {
        let mut will = self.repo.get(store, &request.will_id)?;
        if request.claimer != will.beneficiary {
            return Err(ContractError::Unauthorized {});
        }
        if will.status != WillStatus::Expired {
            return Err(ContractError::NotExpired { id: will.id });
        }
        let index = will.component_index(&request.component_id).ok_or_else(|| {
            ContractError::ComponentNotFound {
                will_id: will.id.clone(),
                component_id: request.component_id.clone(),
            }
        })?;

        let component = &mut will.components[index];
        let ComponentKind::Claim { requirement } = &component.kind else {
            return Err(ContractError::ComponentNotClaimable {
                component_id: component.id.clone(),
            });
        };
        if component.status != ComponentStatus::Active {
            return Err(ContractError::ComponentNotClaimable {
                component_id: component.id.clone(),
            });
        }

        self.verifier.verify(requirement, &request.proof)?;
        component.advance(ComponentStatus::Claimed)?;
        self.repo.put(store, &will)?;
        Ok(will)
    }

    fn validate_components(&self, components: &[ComponentMsg]) -> Result<(), ContractError> {
        if components.is_empty() {
            return Err(ContractError::invalid("a will needs at least one component"));
        }
        let mut seen = HashSet::new();
        for component in components {
            if component.id.is_empty() {
                return Err(ContractError::invalid("component id must not be empty"));
            }
            if !seen.insert(component.id.as_str()) {
                return Err(ContractError::invalid(format!(
                    "duplicate component id {}",
                    component.id
                )));
            }
            self.validate_kind(&component.id, &component.kind)?;
        }
        Ok(())
    }

    fn validate_kind(&self, component_id: &str, kind: &ComponentKind) -> Result<(), ContractError> {
        let bad = |what: &str| {
            ContractError::invalid(format!(
                "{} component {component_id}: {what}",
                kind.as_str()
            ))
        };
        match kind {
            ComponentKind::Transfer { to, amount } => {
                if to.is_empty() {
                    return Err(bad("empty recipient"));
                }
                if amount.denom.is_empty() {
                    return Err(bad("empty denom"));
                }
                if amount.amount.is_zero() {
                    return Err(bad("zero amount"));
                }
            }
            ComponentKind::Contract { address, .. } => {
                if address.is_empty() {
                    return Err(bad("empty contract address"));
                }
            }
            ComponentKind::CrossChainMessage { channel, port, .. } => {
                if channel.is_empty() || port.is_empty() {
                    return Err(bad("channel and port are required"));
                }
            }
            ComponentKind::Claim {
                requirement: ClaimRequirement::Schnorr { public_key },
            } => {
                let key = hex::decode(public_key).map_err(|e| bad(&format!("public key: {e}")))?;
                check_point(&key).map_err(|e| bad(&format!("public key: {e}")))?;
            }
            ComponentKind::Claim {
                requirement:
                    ClaimRequirement::Pedersen {
                        commitment,
                        target_commitment,
                    },
            } => {
                check_point(commitment).map_err(|e| bad(&format!("commitment: {e}")))?;
                check_point(target_commitment)
                    .map_err(|e| bad(&format!("target commitment: {e}")))?;
            }
        }
        Ok(())
    }
}

fn check_point(bytes: &[u8]) -> Result<(), String> {
    if bytes.len() != POINT_LEN {
        return Err(format!("expected {POINT_LEN} bytes, got {}", bytes.len()));
    }
    pedersen::parse_point(bytes)
        .map(|_| ())
        .map_err(|e| e.to_string())
}
