use std::collections::BTreeMap;

use cosmwasm_std::{
    entry_point, to_json_binary, Api, BankMsg, Binary, Coin, Deps, DepsMut, Env, Event,
    MessageInfo, Reply, Response, StdError, StdResult, Uint128,
};
use cw2::set_contract_version;

use crate::error::ContractError;
use crate::executor::{settled_event, ComponentExecutor};
use crate::host::Outbox;
use crate::lifecycle::WillLifecycleManager;
use crate::msg::{
    ClaimProof, ClaimRequest, ComponentMsg, ConfigResponse, CreateWillRequest, ExecuteMsg,
    InstantiateMsg, QueryMsg, SudoMsg, WillIdsResponse, WillResponse, WillsResponse,
};
use crate::repository::WillRepository;
use crate::scheduler::{ComponentFailure, MaturityScheduler};
use crate::state::{
    ComponentKind, ComponentStatus, Config, PendingEffect, Will, CONFIG, NEXT_REPLY_ID,
    PENDING_EFFECTS,
};
use crate::verifier::ClaimVerifier;

const CONTRACT_NAME: &str = "crates.io:will";
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    _info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    let mut config = Config::default();
    apply_config(
        &mut config,
        msg.max_wills_per_height,
        msg.ibc_packet_timeout_seconds,
    )?;
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new()
        .add_attribute("method", "instantiate")
        .add_attribute("max_wills_per_height", config.max_wills_per_height.to_string())
        .add_attribute(
            "ibc_packet_timeout_seconds",
            config.ibc_packet_timeout_seconds.to_string(),
        ))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    match msg {
        ExecuteMsg::CreateWill {
            name,
            beneficiary,
            maturity_height,
            components,
        } => execute_create_will(deps, env, info, name, beneficiary, maturity_height, components),
        ExecuteMsg::Claim {
            will_id,
            component_id,
            proof,
        } => execute_claim(deps, info, will_id, component_id, proof),
    }
}

pub fn execute_create_will(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    name: String,
    beneficiary: String,
    maturity_height: u64,
    components: Vec<ComponentMsg>,
) -> Result<Response, ContractError> {
    let beneficiary = deps.api.addr_validate(&beneficiary)?;
    check_targets(deps.api, &components)?;
    check_escrow(&info.funds, &components)?;

    let config = CONFIG.load(deps.storage)?;
    let verifier = ClaimVerifier::new();
    let manager = WillLifecycleManager::new(WillRepository::from_config(&config), &verifier);
    let will = manager.create_will(
        deps.storage,
        &env.block,
        CreateWillRequest {
            creator: info.sender.to_string(),
            name,
            beneficiary: beneficiary.into_string(),
            maturity_height,
            components,
        },
    )?;

    Ok(Response::new()
        .add_attribute("method", "create_will")
        .add_attribute("will_id", will.id)
        .add_attribute("creator", will.creator)
        .add_attribute("beneficiary", will.beneficiary)
        .add_attribute("maturity_height", will.maturity_height.to_string())
        .add_attribute("components", will.components.len().to_string()))
}

pub fn execute_claim(
    deps: DepsMut,
    info: MessageInfo,
    will_id: String,
    component_id: String,
    proof: ClaimProof,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let verifier = ClaimVerifier::new();
    let manager = WillLifecycleManager::new(WillRepository::from_config(&config), &verifier);

    let scheme = proof.scheme();
    let request = ClaimRequest {
        claimer: info.sender.to_string(),
        will_id,
        component_id,
        proof,
    };
    manager.claim(deps.storage, &request)?;

    Ok(Response::new()
        .add_attribute("method", "claim")
        .add_attribute("will_id", request.will_id)
        .add_attribute("component_id", request.component_id)
        .add_attribute("claimer", request.claimer)
        .add_attribute("scheme", scheme))
}

/// Transfer recipients and called contracts must be addresses on this
/// chain, otherwise their escrow could never leave the contract.
fn check_targets(api: &dyn Api, components: &[ComponentMsg]) -> Result<(), ContractError> {
    for component in components {
        let (what, address) = match &component.kind {
            ComponentKind::Transfer { to, .. } => ("recipient", to),
            ComponentKind::Contract { address, .. } => ("contract", address),
            _ => continue,
        };
        api.addr_validate(address).map_err(|e| {
            ContractError::invalid(format!(
                "component {}: {what} {address}: {e}",
                component.id
            ))
        })?;
    }
    Ok(())
}

/// The contract pays transfers out of what it holds, so the funds sent with
/// a new will must match its transfers denom by denom.
fn check_escrow(funds: &[Coin], components: &[ComponentMsg]) -> Result<(), ContractError> {
    let mut required: BTreeMap<&str, Uint128> = BTreeMap::new();
    for component in components {
        if let ComponentKind::Transfer { amount, .. } = &component.kind {
            let total = required.entry(amount.denom.as_str()).or_default();
            *total = total.checked_add(amount.amount).map_err(StdError::from)?;
        }
    }

    let mut attached: BTreeMap<&str, Uint128> = BTreeMap::new();
    for coin in funds.iter().filter(|c| !c.amount.is_zero()) {
        let total = attached.entry(coin.denom.as_str()).or_default();
        *total = total.checked_add(coin.amount).map_err(StdError::from)?;
    }

    if required != attached {
        return Err(ContractError::invalid(format!(
            "attached funds {} do not match transfers {}",
            describe(&attached),
            describe(&required)
        )));
    }
    Ok(())
}

fn describe(amounts: &BTreeMap<&str, Uint128>) -> String {
    if amounts.is_empty() {
        return "none".to_string();
    }
    amounts
        .iter()
        .map(|(denom, amount)| format!("{amount}{denom}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn apply_config(
    config: &mut Config,
    max_wills_per_height: Option<u32>,
    ibc_packet_timeout_seconds: Option<u64>,
) -> Result<(), ContractError> {
    if let Some(max) = max_wills_per_height {
        if max == 0 {
            return Err(ContractError::invalid(
                "max_wills_per_height must be at least 1",
            ));
        }
        config.max_wills_per_height = max;
    }
    if let Some(timeout) = ibc_packet_timeout_seconds {
        config.ibc_packet_timeout_seconds = timeout;
    }
    Ok(())
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn sudo(deps: DepsMut, env: Env, msg: SudoMsg) -> Result<Response, ContractError> {
    match msg {
        SudoMsg::BeginBlock {} => sudo_begin_block(deps, env),
        SudoMsg::UpdateConfig {
            max_wills_per_height,
            ibc_packet_timeout_seconds,
        } => sudo_update_config(deps, max_wills_per_height, ibc_packet_timeout_seconds),
    }
}

pub fn sudo_begin_block(deps: DepsMut, env: Env) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let first_reply_id = NEXT_REPLY_ID.may_load(deps.storage)?.unwrap_or(1);
    let outbox = Outbox::new(
        deps.api,
        &env,
        config.ibc_packet_timeout_seconds,
        first_reply_id,
    );
    let executor = ComponentExecutor::new(&outbox, &outbox, &outbox);
    let repo = WillRepository::from_config(&config);

    let report = MaturityScheduler::new(repo).run(deps.storage, &env.block, &executor)?;

    NEXT_REPLY_ID.save(deps.storage, &outbox.next_reply_id())?;
    for effect in &report.in_flight {
        PENDING_EFFECTS.save(
            deps.storage,
            effect.reply_id,
            &PendingEffect {
                will_id: effect.will_id.clone(),
                component_id: effect.component_id.clone(),
            },
        )?;
    }

    if let Some(reason) = &report.index_error {
        deps.api.debug(&format!(
            "height {}: index unreadable: {reason}",
            report.height
        ));
    }
    for skipped in &report.skipped_wills {
        deps.api.debug(&format!(
            "height {}: skipped will {}: {}",
            report.height, skipped.will_id, skipped.reason
        ));
    }

    let mut refunds = vec![];
    let mut refund_events = vec![];
    for failed in &report.failed_components {
        deps.api.debug(&format!(
            "height {}: will {} component {} not executed: {}",
            report.height, failed.will_id, failed.component_id, failed.reason
        ));
        let will = repo.get(deps.storage, &failed.will_id)?;
        if let Some((msg, event)) = refund(&will, &failed.component_id) {
            refunds.push(msg);
            refund_events.push(event);
        }
    }

    let failure_events = report.failure_events();
    Ok(Response::new()
        .add_submessages(outbox.into_messages())
        .add_messages(refunds)
        .add_events(report.events)
        .add_events(failure_events)
        .add_events(refund_events)
        .add_attribute("method", "begin_block")
        .add_attribute("height", report.height.to_string())
        .add_attribute("processed_wills", report.processed.len().to_string())
        .add_attribute("skipped_wills", report.skipped_wills.len().to_string())
        .add_attribute(
            "failed_components",
            report.failed_components.len().to_string(),
        )
        .add_attribute("queued_effects", report.in_flight.len().to_string()))
}

/// A transfer that can no longer be paid sends its escrow back to the
/// will's creator. Anything else has nothing to return.
fn refund(will: &Will, component_id: &str) -> Option<(BankMsg, Event)> {
    let component = will.components.iter().find(|c| c.id == component_id)?;
    let ComponentKind::Transfer { amount, .. } = &component.kind else {
        return None;
    };
    if component.status != ComponentStatus::Pending {
        return None;
    }
    let msg = BankMsg::Send {
        to_address: will.creator.clone(),
        amount: vec![amount.clone()],
    };
    let event = Event::new("will_refund")
        .add_attribute("will_id", &will.id)
        .add_attribute("component_id", component_id)
        .add_attribute("to", &will.creator)
        .add_attribute("amount", amount.to_string());
    Some((msg, event))
}

pub fn sudo_update_config(
    deps: DepsMut,
    max_wills_per_height: Option<u32>,
    ibc_packet_timeout_seconds: Option<u64>,
) -> Result<Response, ContractError> {
    let mut config = CONFIG.load(deps.storage)?;
    apply_config(&mut config, max_wills_per_height, ibc_packet_timeout_seconds)?;
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new()
        .add_attribute("method", "update_config")
        .add_attribute("max_wills_per_height", config.max_wills_per_height.to_string())
        .add_attribute(
            "ibc_packet_timeout_seconds",
            config.ibc_packet_timeout_seconds.to_string(),
        ))
}

/// Every effect queued at maturity reports back here under its own id.
/// Success settles the component; failure leaves it `Pending`, refunds a
/// transfer's escrow and stands on its own without undoing its siblings.
#[cfg_attr(not(feature = "library"), entry_point)]
pub fn reply(deps: DepsMut, _env: Env, msg: Reply) -> Result<Response, ContractError> {
    let effect = PENDING_EFFECTS
        .may_load(deps.storage, msg.id)?
        .ok_or_else(|| ContractError::invalid(format!("unknown reply id {}", msg.id)))?;
    PENDING_EFFECTS.remove(deps.storage, msg.id);

    let config = CONFIG.load(deps.storage)?;
    let repo = WillRepository::from_config(&config);
    let mut will = repo.get(deps.storage, &effect.will_id)?;
    let index = will
        .component_index(&effect.component_id)
        .ok_or_else(|| ContractError::ComponentNotFound {
            will_id: effect.will_id.clone(),
            component_id: effect.component_id.clone(),
        })?;

    let response = Response::new()
        .add_attribute("method", "reply")
        .add_attribute("will_id", &effect.will_id)
        .add_attribute("component_id", &effect.component_id);

    match msg.result.into_result() {
        Ok(_) => {
            let status = will.components[index].kind.matured_status();
            will.components[index].advance(status)?;
            repo.put(deps.storage, &will)?;
            Ok(response.add_events(settled_event(&will, &will.components[index])))
        }
        Err(error) => {
            deps.api.debug(&format!(
                "will {} component {} failed: {error}",
                effect.will_id, effect.component_id
            ));
            let failure = ComponentFailure {
                will_id: effect.will_id,
                component_id: effect.component_id,
                reason: error.clone(),
            };
            let mut response = response
                .add_event(failure.event())
                .add_attribute("will_message_failed", error);
            if let Some((send, event)) = refund(&will, &failure.component_id) {
                response = response.add_message(send).add_event(event);
            }
            Ok(response)
        }
    }
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, _env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        QueryMsg::Config {} => to_json_binary(&query_config(deps)?),
        QueryMsg::GetWillById { id } => to_json_binary(&query_will(deps, id)?),
        QueryMsg::ListWillsByAddress { address } => {
            to_json_binary(&query_wills_by_address(deps, address)?)
        }
        QueryMsg::WillsAtHeight { height } => to_json_binary(&query_wills_at_height(deps, height)?),
    }
}

fn query_config(deps: Deps) -> StdResult<ConfigResponse> {
    let config = CONFIG.load(deps.storage)?;
    Ok(ConfigResponse {
        max_wills_per_height: config.max_wills_per_height,
        ibc_packet_timeout_seconds: config.ibc_packet_timeout_seconds,
    })
}

fn query_will(deps: Deps, id: String) -> StdResult<WillResponse> {
    let config = CONFIG.load(deps.storage)?;
    let will = WillRepository::from_config(&config)
        .get(deps.storage, &id)
        .map_err(into_std)?;
    Ok(WillResponse { will })
}

fn query_wills_by_address(deps: Deps, address: String) -> StdResult<WillsResponse> {
    let address = deps.api.addr_validate(&address)?;
    let config = CONFIG.load(deps.storage)?;

    let mut listing =
        WillRepository::from_config(&config).list_by_creator(deps.storage, address.as_str())?;
    let wills = listing.by_ref().collect();
    Ok(WillsResponse {
        wills,
        skipped: listing.skipped() as u32,
    })
}

fn query_wills_at_height(deps: Deps, height: u64) -> StdResult<WillIdsResponse> {
    let config = CONFIG.load(deps.storage)?;
    let ids = WillRepository::from_config(&config).index_by_height(deps.storage, height)?;
    Ok(WillIdsResponse { height, ids })
}

fn into_std(err: ContractError) -> StdError {
    match err {
        ContractError::Std(err) => err,
        ContractError::NotFound { id } => StdError::not_found(format!("will {id}")),
        other => StdError::generic_err(other.to_string()),
    }
}
