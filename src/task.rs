//! On-chain task model.
//!
//! Tasks arrive as `NewTaskCreated` logs. Each log is decoded into a strongly typed
//! [`Task`] before anything else in the pipeline looks at it; logs that fail
//! validation never get past [`decode_task_log`].

use crate::error::DecodeError;
use alloy::primitives::{B256, U256};
use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;
use std::fmt;

alloy::sol! {
    /// Task payload as stored by the task contract.
    #[derive(Debug, PartialEq, Eq)]
    struct ValuationTask {
        string subject;
        uint32 taskCreatedBlock;
    }

    event NewTaskCreated(uint32 indexed taskIndex, ValuationTask task);

    function respondToTask(
        ValuationTask task,
        uint256 score,
        string evidenceUri,
        uint32 referenceTaskIndex,
        bytes signature
    ) external;
}

/// Chain-assigned task ordinal. Deduplication key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskIndex(pub u64);

impl fmt::Display for TaskIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TaskIndex {
    fn from(value: u32) -> Self {
        Self(u64::from(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Discovered,
    Valuating,
    Submitting,
    Completed,
    /// Terminal for the current tick only; the task may be rediscovered.
    Failed,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Valuating => "valuating",
            Self::Submitting => "submitting",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    fn can_advance_to(self, next: LifecycleState) -> bool {
        matches!(
            (self, next),
            (Self::Discovered, Self::Valuating)
                | (Self::Valuating, Self::Submitting)
                | (Self::Submitting, Self::Completed)
                | (Self::Discovered | Self::Valuating | Self::Submitting, Self::Failed)
        )
    }
}

/// Result of the external valuation pipeline for one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationResult {
    pub score: f64,
    pub evidence_uri: String,
    pub display_name: String,
}

impl ValuationResult {
    /// Score as reported on-chain: rounded to the nearest whole unit.
    pub fn onchain_score(&self) -> U256 {
        U256::from(self.score.round() as u128)
    }
}

/// Handle of a sent response transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxHandle(pub B256);

impl fmt::Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// One unit of on-chain work, alive only while its log is being handled.
#[derive(Debug, Clone)]
pub struct Task {
    pub index: TaskIndex,
    pub subject: String,
    pub creation_block: u64,
    /// Payload echoed back to the contract when responding.
    pub payload: ValuationTask,
    state: LifecycleState,
    pub valuation: Option<ValuationResult>,
    pub response_tx: Option<TxHandle>,
}

impl Task {
    pub fn new(index: TaskIndex, creation_block: u64, payload: ValuationTask) -> Self {
        Self {
            index,
            subject: payload.subject.clone(),
            creation_block,
            payload,
            state: LifecycleState::Discovered,
            valuation: None,
            response_tx: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Moves the task forward. Out-of-order transitions are ignored and logged.
    pub fn advance(&mut self, next: LifecycleState) {
        if !self.state.can_advance_to(next) {
            tracing::debug!(
                "[TASK] ignoring lifecycle transition {} -> {} for task {}",
                self.state.as_str(),
                next.as_str(),
                self.index
            );
            return;
        }
        tracing::debug!(
            "[TASK] task {} {} -> {}",
            self.index,
            self.state.as_str(),
            next.as_str()
        );
        self.state = next;
    }
}

/// Schema-validated decode of a `NewTaskCreated` log.
pub fn decode_task_log(log: &Log) -> Result<Task, DecodeError> {
    if log.topic0() != Some(&NewTaskCreated::SIGNATURE_HASH) {
        return Err(DecodeError::SelectorMismatch);
    }
    let creation_block = log.block_number.ok_or(DecodeError::MissingBlockNumber)?;
    let event = NewTaskCreated::decode_log_data(log.data(), true)
        .map_err(|e| DecodeError::Abi(e.to_string()))?;

    let index = TaskIndex::from(event.taskIndex);
    if event.task.subject.trim().is_empty() {
        return Err(DecodeError::EmptySubject {
            task_index: index.0,
        });
    }
    Ok(Task::new(index, creation_block, event.task))
}
