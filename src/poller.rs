//! Range-Chunked Log Poller.
//!
//! One [`TaskPoller`] owns everything that changes between ticks: the
//! watermark, the deduplication sets and the failure streak. Each tick walks
//! `[watermark + 1, head]` in windows of `MAX_LOG_CHUNK_SIZE` blocks, handles
//! every task log in the order the chain returned it, and only then moves the
//! watermark to `head`. A chain-access failure anywhere in the walk leaves the
//! watermark untouched so the next tick retries the same span.

use crate::chain::ChainClient;
use crate::classifier::{classify, ErrorClassifier};
use crate::dedup::TaskDeduplicator;
use crate::error::{OperatorError, RpcError};
use crate::scoring::ScoringInvoker;
use crate::submitter::ResponseSubmitter;
use crate::task::{decode_task_log, LifecycleState, Task, TaskIndex};
use crate::utils::blackbox::{self, EventKind};
use crate::utils::constants::{DEFAULT_CONSECUTIVE_FAILURE_THRESHOLD, MAX_LOG_CHUNK_SIZE};
use crate::utils::error::compact_error;
use alloy::rpc::types::Log;
use std::sync::Arc;

/// Inclusive block windows covering `[from, to]`, none wider than `chunk_size`.
pub fn chunk_ranges(from: u64, to: u64, chunk_size: u64) -> Vec<(u64, u64)> {
    let chunk_size = chunk_size.max(1);
    let mut ranges = Vec::new();
    let mut start = from;
    while start <= to {
        let end = start.saturating_add(chunk_size - 1).min(to);
        ranges.push((start, end));
        if end == u64::MAX {
            break;
        }
        start = end + 1;
    }
    ranges
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickStatus {
    /// Head has not moved past the watermark.
    Idle,
    /// Full span walked; watermark advanced to the observed head.
    Completed,
    /// Head or log query failed; watermark unchanged.
    ChainAccessError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub head: Option<u64>,
    pub range: Option<(u64, u64)>,
    pub chunks: usize,
    pub logs_seen: usize,
    pub completed: Vec<TaskIndex>,
    pub skipped_duplicates: usize,
    pub task_failures: usize,
    pub escalated: bool,
    pub status: TickStatus,
}

impl TickOutcome {
    fn new() -> Self {
        Self {
            head: None,
            range: None,
            chunks: 0,
            logs_seen: 0,
            completed: Vec::new(),
            skipped_duplicates: 0,
            task_failures: 0,
            escalated: false,
            status: TickStatus::Idle,
        }
    }

    pub fn is_chain_access_error(&self) -> bool {
        matches!(self.status, TickStatus::ChainAccessError(_))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollerSettings {
    pub consecutive_failure_threshold: u32,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            consecutive_failure_threshold: DEFAULT_CONSECUTIVE_FAILURE_THRESHOLD,
        }
    }
}

pub struct TaskPoller {
    chain: Arc<dyn ChainClient>,
    scoring: Arc<dyn ScoringInvoker>,
    submitter: Arc<dyn ResponseSubmitter>,
    watermark: u64,
    dedup: TaskDeduplicator,
    classifier: ErrorClassifier,
}

impl TaskPoller {
    /// `start_watermark` is treated as already processed; the first tick
    /// starts at `start_watermark + 1`.
    pub fn new(
        chain: Arc<dyn ChainClient>,
        scoring: Arc<dyn ScoringInvoker>,
        submitter: Arc<dyn ResponseSubmitter>,
        settings: PollerSettings,
        start_watermark: u64,
    ) -> Self {
        Self {
            chain,
            scoring,
            submitter,
            watermark: start_watermark,
            dedup: TaskDeduplicator::new(),
            classifier: ErrorClassifier::new(settings.consecutive_failure_threshold),
        }
    }

    pub fn watermark(&self) -> u64 {
        self.watermark
    }

    pub fn dedup(&self) -> &TaskDeduplicator {
        &self.dedup
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    pub async fn tick(&mut self) -> TickOutcome {
        let mut outcome = TickOutcome::new();

        // Ticks never overlap, so anything still in flight was abandoned by a
        // tick that panicked mid-task.
        let abandoned = self.dedup.release_in_flight();
        if abandoned > 0 {
            tracing::warn!(
                "[TASK] released {} task(s) left in flight by an interrupted tick",
                abandoned
            );
        }

        let head = match self.chain.head_block().await {
            Ok(head) => head,
            Err(err) => return self.abort_tick(outcome, err),
        };
        outcome.head = Some(head);

        if head <= self.watermark {
            self.classifier.record_success();
            tracing::debug!(
                "[POLL] no new blocks (head={} watermark={})",
                head,
                self.watermark
            );
            return outcome;
        }

        let from = self.watermark.saturating_add(1);
        outcome.range = Some((from, head));
        for (chunk_from, chunk_to) in chunk_ranges(from, head, MAX_LOG_CHUNK_SIZE) {
            let logs = match self.chain.task_logs(chunk_from, chunk_to).await {
                Ok(logs) => logs,
                Err(err) => return self.abort_tick(outcome, err),
            };
            outcome.chunks += 1;
            outcome.logs_seen += logs.len();
            if !logs.is_empty() {
                tracing::info!(
                    "[POLL] {} task log(s) in blocks [{}, {}]",
                    logs.len(),
                    chunk_from,
                    chunk_to
                );
            }
            for log in &logs {
                self.handle_log(log, &mut outcome).await;
            }
        }

        self.watermark = head;
        self.classifier.record_success();
        outcome.status = TickStatus::Completed;
        tracing::info!(
            "[POLL] walked [{}, {}] in {} chunk(s): logs={} completed={} duplicates={} failures={}",
            from,
            head,
            outcome.chunks,
            outcome.logs_seen,
            outcome.completed.len(),
            outcome.skipped_duplicates,
            outcome.task_failures
        );
        blackbox::record(
            EventKind::Tick,
            format!(
                "walked [{from}, {head}] completed={} failures={}",
                outcome.completed.len(),
                outcome.task_failures
            ),
        );
        outcome
    }

    fn abort_tick(&mut self, mut outcome: TickOutcome, err: RpcError) -> TickOutcome {
        let err = OperatorError::from(err);
        let message = compact_error(&err);
        tracing::warn!(
            "[POLL] tick aborted, watermark stays at {}: {}",
            self.watermark,
            message
        );
        blackbox::record(EventKind::ChainAccess, message.clone());
        outcome.escalated = self.classifier.record_chain_failure(&err);
        outcome.status = TickStatus::ChainAccessError(message);
        outcome
    }

    /// Decode -> admit -> valuate -> submit -> commit. Any failure rolls the
    /// task back and is contained here; siblings in the batch are unaffected.
    async fn handle_log(&mut self, log: &Log, outcome: &mut TickOutcome) {
        let mut task = match decode_task_log(log) {
            Ok(task) => task,
            Err(err) => {
                let err = OperatorError::from(err);
                outcome.task_failures += 1;
                tracing::warn!(
                    "[TASK] dropping undecodable log block={:?} log_index={:?} tx={:?} (class={}): {}",
                    log.block_number,
                    log.log_index,
                    log.transaction_hash,
                    classify(&err).as_str(),
                    err
                );
                blackbox::record(
                    EventKind::TaskFailure,
                    format!("log at block {:?}: {err}", log.block_number),
                );
                return;
            }
        };

        if !self.dedup.admit(task.index) {
            outcome.skipped_duplicates += 1;
            tracing::debug!(
                "[TASK] task {} already in flight or completed; skipping",
                task.index
            );
            return;
        }

        match self.process_task(&mut task).await {
            Ok(()) => {
                task.advance(LifecycleState::Completed);
                self.dedup.commit(task.index);
                outcome.completed.push(task.index);
                tracing::info!(
                    "[TASK] task {} completed subject={} tx={}",
                    task.index,
                    task.subject,
                    task.response_tx
                        .map(|tx| tx.to_string())
                        .unwrap_or_default()
                );
            }
            Err(err) => {
                task.advance(LifecycleState::Failed);
                self.dedup.rollback(task.index);
                outcome.task_failures += 1;
                let message = compact_error(&err);
                tracing::warn!(
                    "[TASK] task {} failed (class={}) subject={}: {}",
                    task.index,
                    classify(&err).as_str(),
                    task.subject,
                    message
                );
                blackbox::record(
                    EventKind::TaskFailure,
                    format!("task {}: {message}", task.index),
                );
            }
        }
    }

    async fn process_task(&self, task: &mut Task) -> Result<(), OperatorError> {
        task.advance(LifecycleState::Valuating);
        let valuation = self.scoring.invoke(&task.subject).await?;
        tracing::debug!(
            "[SCORE] task {} subject={} ({}) score={}",
            task.index,
            task.subject,
            valuation.display_name,
            valuation.score
        );

        task.valuation = Some(valuation.clone());

        task.advance(LifecycleState::Submitting);
        let tx = self.submitter.submit(task, &valuation).await?;
        task.response_tx = Some(tx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::chunk_ranges;
    use proptest::prelude::*;

    #[test]
    fn test_chunk_ranges_splits_at_chunk_boundary() {
        assert_eq!(chunk_ranges(101, 250, 100), vec![(101, 200), (201, 250)]);
        assert_eq!(chunk_ranges(1, 100, 100), vec![(1, 100)]);
        assert_eq!(chunk_ranges(5, 5, 100), vec![(5, 5)]);
    }

    #[test]
    fn test_chunk_ranges_empty_when_from_exceeds_to() {
        assert!(chunk_ranges(11, 10, 100).is_empty());
    }

    #[test]
    fn test_chunk_ranges_terminates_at_u64_max() {
        let ranges = chunk_ranges(u64::MAX - 150, u64::MAX, 100);
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges.last().map(|r| r.1), Some(u64::MAX));
    }

    proptest! {
        #[test]
        fn prop_chunk_ranges_are_bounded_and_contiguous(
            from in 0u64..1_000_000,
            span in 0u64..5_000,
            chunk in 1u64..=100,
        ) {
            let to = from + span;
            let ranges = chunk_ranges(from, to, chunk);
            prop_assert_eq!(ranges.first().map(|r| r.0), Some(from));
            prop_assert_eq!(ranges.last().map(|r| r.1), Some(to));
            for (start, end) in &ranges {
                prop_assert!(start <= end);
                prop_assert!(end - start + 1 <= chunk);
            }
            for pair in ranges.windows(2) {
                prop_assert_eq!(pair[0].1 + 1, pair[1].0);
            }
        }
    }
}
