//! Capabilities the will engine needs from its host chain, one trait per
//! collaborator, plus the adapter used when running as a contract.

use std::cell::{Cell, RefCell};

use cosmwasm_std::{
    Addr, Api, BankMsg, Binary, BlockInfo, Coin, CosmosMsg, Env, IbcMsg, IbcTimeout, SubMsg,
    WasmMsg,
};

use crate::error::ContractError;

/// How a host carried out an effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery<T = ()> {
    /// Applied during the call
    Done(T),
    /// Handed off; the outcome arrives later under this reply id
    Queued(u64),
}

pub trait TransferPrimitive {
    fn send(&self, from: &str, to: &str, amount: &Coin) -> Result<Delivery, ContractError>;
}

pub trait ContractInvoker {
    fn execute(
        &self,
        address: &str,
        caller: &str,
        payload: &Binary,
        funds: &[Coin],
    ) -> Result<Delivery<Binary>, ContractError>;
}

pub trait CrossChainMessenger {
    fn send(&self, channel: &str, port: &str, payload: &Binary) -> Result<Delivery, ContractError>;
}

pub trait HeightClock {
    fn current_height(&self) -> u64;
}

impl HeightClock for BlockInfo {
    fn current_height(&self) -> u64 {
        self.height
    }
}

/// Queues every effect as a submessage on the contract's response.
///
/// Transfers are paid from the balance the contract escrowed when the will
/// was created. Each message gets its own reply id and replies whether it
/// succeeds or not, so one failing effect is reported through `reply`
/// without reverting its siblings.
pub struct Outbox<'a> {
    api: &'a dyn Api,
    contract: Addr,
    packet_timeout: IbcTimeout,
    next_reply_id: Cell<u64>,
    messages: RefCell<Vec<SubMsg>>,
}

impl<'a> Outbox<'a> {
    /// Reply ids are handed out from `first_reply_id` upwards.
    pub fn new(
        api: &'a dyn Api,
        env: &Env,
        packet_timeout_seconds: u64,
        first_reply_id: u64,
    ) -> Self {
        Outbox {
            api,
            contract: env.contract.address.clone(),
            packet_timeout: IbcTimeout::with_timestamp(
                env.block.time.plus_seconds(packet_timeout_seconds),
            ),
            next_reply_id: Cell::new(first_reply_id),
            messages: RefCell::new(vec![]),
        }
    }

    /// The contract's own IBC port.
    pub fn port(&self) -> String {
        format!("wasm.{}", self.contract)
    }

    /// First reply id not yet handed out.
    pub fn next_reply_id(&self) -> u64 {
        self.next_reply_id.get()
    }

    pub fn into_messages(self) -> Vec<SubMsg> {
        self.messages.into_inner()
    }

    fn push(&self, msg: impl Into<CosmosMsg>) -> u64 {
        let id = self.next_reply_id.get();
        self.next_reply_id.set(id + 1);
        self.messages.borrow_mut().push(SubMsg::reply_always(msg, id));
        id
    }

    fn validate(&self, what: &str, address: &str) -> Result<Addr, ContractError> {
        self.api
            .addr_validate(address)
            .map_err(|e| ContractError::ExecutionFailed(format!("{what} {address}: {e}")))
    }
}

impl TransferPrimitive for Outbox<'_> {
    fn send(&self, _from: &str, to: &str, amount: &Coin) -> Result<Delivery, ContractError> {
        let to = self.validate("recipient", to)?;
        if amount.amount.is_zero() {
            return Err(ContractError::ExecutionFailed(
                "zero-amount transfer".to_string(),
            ));
        }
        let id = self.push(BankMsg::Send {
            to_address: to.into_string(),
            amount: vec![amount.clone()],
        });
        Ok(Delivery::Queued(id))
    }
}

impl ContractInvoker for Outbox<'_> {
    /// The contract itself is the sender on chain; `caller` is only
    /// meaningful to hosts that can act on an account's behalf.
    fn execute(
        &self,
        address: &str,
        _caller: &str,
        payload: &Binary,
        funds: &[Coin],
    ) -> Result<Delivery<Binary>, ContractError> {
        let contract_addr = self.validate("contract", address)?;
        let id = self.push(WasmMsg::Execute {
            contract_addr: contract_addr.into_string(),
            msg: payload.clone(),
            funds: funds.to_vec(),
        });
        Ok(Delivery::Queued(id))
    }
}

impl CrossChainMessenger for Outbox<'_> {
    fn send(
        &self,
        channel: &str,
        port: &str,
        payload: &Binary,
    ) -> Result<Delivery, ContractError> {
        if channel.is_empty() {
            return Err(ContractError::ExecutionFailed("empty channel".to_string()));
        }
        if port != self.port() {
            return Err(ContractError::ExecutionFailed(format!(
                "packets can only leave from {}, not {port}",
                self.port()
            )));
        }
        let id = self.push(IbcMsg::SendPacket {
            channel_id: channel.to_string(),
            data: payload.clone(),
            timeout: self.packet_timeout.clone(),
        });
        Ok(Delivery::Queued(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmwasm_std::testing::{mock_dependencies, mock_env};
    use cosmwasm_std::{coin, ReplyOn};

    #[test]
    fn block_info_is_a_clock() {
        let mut env = mock_env();
        env.block.height = 77;
        assert_eq!(env.block.current_height(), 77);
    }

    #[test]
    fn queues_effects_in_call_order_with_fresh_reply_ids() {
        let deps = mock_dependencies();
        let env = mock_env();
        let outbox = Outbox::new(&deps.api, &env, 100, 7);

        let transfer = TransferPrimitive::send(&outbox, "alice", "bob", &coin(5, "uwill")).unwrap();
        let call = outbox
            .execute("registry", "alice", &Binary::from(b"{}".to_vec()), &[])
            .unwrap();
        let port = outbox.port();
        let packet =
            CrossChainMessenger::send(&outbox, "channel-0", &port, &Binary::from(b"hi".to_vec()))
                .unwrap();

        assert_eq!(transfer, Delivery::Queued(7));
        assert_eq!(call, Delivery::Queued(8));
        assert_eq!(packet, Delivery::Queued(9));
        assert_eq!(outbox.next_reply_id(), 10);

        let msgs = outbox.into_messages();
        assert_eq!(msgs.len(), 3);
        assert!(msgs.iter().all(|m| m.reply_on == ReplyOn::Always));
        let ids: Vec<u64> = msgs.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![7, 8, 9]);
        assert_eq!(
            msgs[0].msg,
            CosmosMsg::Bank(BankMsg::Send {
                to_address: "bob".to_string(),
                amount: vec![coin(5, "uwill")],
            })
        );
        assert!(matches!(msgs[1].msg, CosmosMsg::Wasm(WasmMsg::Execute { .. })));
        assert!(matches!(msgs[2].msg, CosmosMsg::Ibc(IbcMsg::SendPacket { .. })));
    }

    #[test]
    fn rejects_foreign_port_and_bad_addresses() {
        let deps = mock_dependencies();
        let env = mock_env();
        let outbox = Outbox::new(&deps.api, &env, 100, 1);

        let err = CrossChainMessenger::send(&outbox, "channel-0", "transfer", &Binary::default())
            .unwrap_err();
        assert!(matches!(err, ContractError::ExecutionFailed(_)));

        let err = TransferPrimitive::send(&outbox, "alice", "x", &coin(1, "uwill")).unwrap_err();
        assert!(matches!(err, ContractError::ExecutionFailed(_)));

        let err =
            TransferPrimitive::send(&outbox, "alice", "bob", &coin(0, "uwill")).unwrap_err();
        assert!(matches!(err, ContractError::ExecutionFailed(_)));

        // rejected effects do not use up reply ids
        assert_eq!(outbox.next_reply_id(), 1);
        assert!(outbox.into_messages().is_empty());
    }
}
