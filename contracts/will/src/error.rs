use cosmwasm_std::StdError;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("Unauthorized")]
    Unauthorized {},

    #[error("Will {id} not found")]
    NotFound { id: String },

    #[error("Will {id} already exists")]
    AlreadyExists { id: String },

    #[error("Component {component_id} not found in will {will_id}")]
    ComponentNotFound {
        will_id: String,
        component_id: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Too many wills at height {height} (limit {limit})")]
    LimitExceeded { height: u64, limit: u32 },

    #[error("Will {id} has not expired")]
    NotExpired { id: String },

    #[error("Component {component_id} is not claimable")]
    ComponentNotClaimable { component_id: String },

    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    #[error("Unsupported proof kind: {0}")]
    UnsupportedProofKind(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

impl ContractError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ContractError::InvalidArgument(msg.into())
    }

    pub fn verification(msg: impl Into<String>) -> Self {
        ContractError::VerificationFailed(msg.into())
    }
}
