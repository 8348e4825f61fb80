//! Recording fakes and fixtures shared by the unit tests.

use std::cell::RefCell;

use cosmwasm_std::testing::mock_env;
use cosmwasm_std::{coin, Binary, BlockInfo, Coin};

use crate::error::ContractError;
use crate::executor::ComponentExecutor;
use crate::host::{ContractInvoker, CrossChainMessenger, Delivery, TransferPrimitive};
use crate::msg::ComponentMsg;
use crate::state::{
    ClaimRequirement, ComponentKind, ComponentStatus, ExecutionComponent, Will, WillStatus,
};

pub const DENOM: &str = "uwill";

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Transfer {
        from: String,
        to: String,
        amount: Coin,
    },
    Contract {
        address: String,
        caller: String,
        payload: Binary,
    },
    Packet {
        channel: String,
        port: String,
        payload: Binary,
    },
}

/// Records every call in order. Calls whose target (recipient, contract
/// address or channel) is listed in `failing` are recorded and then fail.
#[derive(Default)]
pub struct RecordingHost {
    calls: RefCell<Vec<HostCall>>,
    failing: Vec<String>,
}

impl RecordingHost {
    pub fn failing(targets: &[&str]) -> Self {
        RecordingHost {
            calls: RefCell::new(vec![]),
            failing: targets.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.borrow().clone()
    }

    pub fn executor(&self) -> ComponentExecutor<'_> {
        ComponentExecutor::new(self, self, self)
    }

    fn record(&self, call: HostCall, target: &str) -> Result<(), ContractError> {
        self.calls.borrow_mut().push(call);
        if self.failing.iter().any(|t| t == target) {
            return Err(ContractError::ExecutionFailed(format!("{target} refused")));
        }
        Ok(())
    }
}

impl TransferPrimitive for RecordingHost {
    fn send(&self, from: &str, to: &str, amount: &Coin) -> Result<Delivery, ContractError> {
        let call = HostCall::Transfer {
            from: from.to_string(),
            to: to.to_string(),
            amount: amount.clone(),
        };
        self.record(call, to)?;
        Ok(Delivery::Done(()))
    }
}

impl ContractInvoker for RecordingHost {
    fn execute(
        &self,
        address: &str,
        caller: &str,
        payload: &Binary,
        _funds: &[Coin],
    ) -> Result<Delivery<Binary>, ContractError> {
        let call = HostCall::Contract {
            address: address.to_string(),
            caller: caller.to_string(),
            payload: payload.clone(),
        };
        self.record(call, address)?;
        Ok(Delivery::Done(Binary::default()))
    }
}

impl CrossChainMessenger for RecordingHost {
    fn send(&self, channel: &str, port: &str, payload: &Binary) -> Result<Delivery, ContractError> {
        let call = HostCall::Packet {
            channel: channel.to_string(),
            port: port.to_string(),
            payload: payload.clone(),
        };
        self.record(call, channel)?;
        Ok(Delivery::Done(()))
    }
}

pub fn block(height: u64) -> BlockInfo {
    let mut block = mock_env().block;
    block.height = height;
    block
}

pub fn transfer_kind(to: &str, amount: u128) -> ComponentKind {
    ComponentKind::Transfer {
        to: to.to_string(),
        amount: coin(amount, DENOM),
    }
}

pub fn schnorr_kind(public_key_hex: &str) -> ComponentKind {
    ComponentKind::Claim {
        requirement: ClaimRequirement::Schnorr {
            public_key: public_key_hex.to_string(),
        },
    }
}

pub fn component_msg(id: &str, kind: ComponentKind) -> ComponentMsg {
    ComponentMsg {
        id: id.to_string(),
        name: format!("{id} component"),
        kind,
    }
}

fn pending(id: &str, kind: ComponentKind) -> ExecutionComponent {
    ExecutionComponent {
        id: id.to_string(),
        name: format!("{id} component"),
        status: ComponentStatus::Pending,
        kind,
    }
}

pub fn transfer_component(id: &str, to: &str, amount: u128) -> ExecutionComponent {
    pending(id, transfer_kind(to, amount))
}

pub fn claim_component(id: &str, public_key_hex: &str) -> ExecutionComponent {
    pending(id, schnorr_kind(public_key_hex))
}

pub fn will_with(components: Vec<ExecutionComponent>) -> Will {
    Will {
        id: "will-1".to_string(),
        creator: "alice".to_string(),
        name: "estate".to_string(),
        beneficiary: "bob".to_string(),
        maturity_height: 100,
        status: WillStatus::Live,
        components,
    }
}
