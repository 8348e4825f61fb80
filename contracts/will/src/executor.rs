use cosmwasm_std::Event;

use crate::error::ContractError;
use crate::host::{ContractInvoker, CrossChainMessenger, Delivery, TransferPrimitive};
use crate::state::{ComponentKind, ComponentStatus, ExecutionComponent, Will};

pub const TRANSFER_EVENT: &str = "will_transfer";

/// Result of running one component at maturity.
#[derive(Debug, Clone, PartialEq)]
pub enum Execution {
    /// The effect took place; the component moves to `status`
    Settled {
        status: ComponentStatus,
        event: Option<Event>,
    },
    /// The effect was handed to the host and reports back under
    /// `reply_id`; the component keeps its status until then
    InFlight { reply_id: u64 },
}

/// Audit event for a component whose effect has taken place. Only
/// transfers produce one.
pub fn settled_event(will: &Will, component: &ExecutionComponent) -> Option<Event> {
    let ComponentKind::Transfer { to, amount } = &component.kind else {
        return None;
    };
    Some(
        Event::new(TRANSFER_EVENT)
            .add_attribute("will_id", &will.id)
            .add_attribute("component_id", &component.id)
            .add_attribute("from", &will.creator)
            .add_attribute("to", to)
            .add_attribute("amount", amount.to_string()),
    )
}

/// Performs the side effect of a single component through the host's
/// capabilities.
pub struct ComponentExecutor<'h> {
    transfers: &'h dyn TransferPrimitive,
    contracts: &'h dyn ContractInvoker,
    messenger: &'h dyn CrossChainMessenger,
}

impl<'h> ComponentExecutor<'h> {
    pub fn new(
        transfers: &'h dyn TransferPrimitive,
        contracts: &'h dyn ContractInvoker,
        messenger: &'h dyn CrossChainMessenger,
    ) -> Self {
        ComponentExecutor {
            transfers,
            contracts,
            messenger,
        }
    }

    /// Run `component` of `will`. On error nothing was applied and the
    /// component keeps its status.
    pub fn execute(
        &self,
        will: &Will,
        component: &ExecutionComponent,
    ) -> Result<Execution, ContractError> {
        let delivery = match &component.kind {
            ComponentKind::Transfer { to, amount } => {
                self.transfers.send(&will.creator, to, amount)?
            }
            ComponentKind::Claim { .. } => Delivery::Done(()),
            ComponentKind::Contract { address, payload } => {
                match self.contracts.execute(address, &will.creator, payload, &[])? {
                    Delivery::Done(_) => Delivery::Done(()),
                    Delivery::Queued(reply_id) => Delivery::Queued(reply_id),
                }
            }
            ComponentKind::CrossChainMessage {
                channel,
                port,
                payload,
            } => self.messenger.send(channel, port, payload)?,
        };

        Ok(match delivery {
            Delivery::Done(()) => Execution::Settled {
                status: component.kind.matured_status(),
                event: settled_event(will, component),
            },
            Delivery::Queued(reply_id) => Execution::InFlight { reply_id },
        })
    }
}
