pub mod contract;
mod error;
pub mod executor;
pub mod host;
pub mod id;
pub mod lifecycle;
pub mod msg;
pub mod repository;
pub mod scheduler;
pub mod state;
pub mod verifier;

#[cfg(test)]
mod test_utils;

pub use crate::error::ContractError;
