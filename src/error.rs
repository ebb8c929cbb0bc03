use thiserror::Error;

pub type Result<T> = std::result::Result<T, OperatorError>;

#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("chain access error: {0}")]
    ChainAccess(#[from] RpcError),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("valuation error: {0}")]
    Valuation(#[from] ValuationError),
    #[error("submission error: {0}")]
    Submission(#[from] SubmissionError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl OperatorError {
    /// Failures to reach the chain abort the tick; everything else is isolated to one task.
    pub fn is_chain_access(&self) -> bool {
        matches!(self, Self::ChainAccess(_))
    }
}

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("chain id mismatch: expected {expected}, node reports {actual}")]
    ChainIdMismatch { expected: u64, actual: u64 },
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("log topic0 does not match NewTaskCreated selector")]
    SelectorMismatch,
    #[error("log carries no block number")]
    MissingBlockNumber,
    #[error("abi decode failed: {0}")]
    Abi(String),
    #[error("task {task_index} has an empty subject reference")]
    EmptySubject { task_index: u64 },
}

#[derive(Debug, Error)]
pub enum ValuationError {
    #[error("scoring pipeline unreachable: {0}")]
    Transport(String),
    #[error("scoring pipeline rejected subject `{subject}` with status {status}: {body}")]
    Rejected {
        subject: String,
        status: u16,
        body: String,
    },
    #[error("scoring pipeline returned a malformed payload: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("task index {0} does not fit the on-chain uint32 reference")]
    TaskIndexOverflow(u64),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },
    #[error("confirmation failed: {0}")]
    Confirmation(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rpc_errors_are_chain_access() {
        let chain: OperatorError = RpcError::Transport("connection refused".into()).into();
        assert!(chain.is_chain_access());

        let task: OperatorError = SubmissionError::Reverted {
            tx_hash: "0xabc".into(),
        }
        .into();
        assert!(!task.is_chain_access());

        let decode: OperatorError = DecodeError::SelectorMismatch.into();
        assert!(!decode.is_chain_access());
    }
}
