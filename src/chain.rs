use crate::error::RpcError;
use crate::task::NewTaskCreated;
use crate::utils::rpc::{run_with_retry, HttpProvider};
use alloy::primitives::Address;
use alloy::providers::Provider;
use alloy::rpc::types::{Filter, Log};
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Read side of the ledger as seen by the poller.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn head_block(&self) -> Result<u64, RpcError>;

    /// `NewTaskCreated` logs of the task contract in `[from, to]`, inclusive,
    /// ordered by block then log index.
    async fn task_logs(&self, from: u64, to: u64) -> Result<Vec<Log>, RpcError>;
}

/// Providers do not all promise ordering; sort so the poller can rely on it.
pub fn sort_logs_canonical(logs: &mut [Log]) {
    logs.sort_by_key(|log| {
        (
            log.block_number.unwrap_or(u64::MAX),
            log.log_index.unwrap_or(u64::MAX),
        )
    });
}

pub fn task_filter(contract: Address, from: u64, to: u64) -> Filter {
    Filter::new()
        .address(contract)
        .event_signature(NewTaskCreated::SIGNATURE_HASH)
        .from_block(from)
        .to_block(to)
}

pub struct AlloyChainClient {
    provider: Arc<HttpProvider>,
    task_contract: Address,
    call_timeout: Duration,
    retries: usize,
}

impl AlloyChainClient {
    pub fn new(
        provider: Arc<HttpProvider>,
        task_contract: Address,
        call_timeout: Duration,
        retries: usize,
    ) -> Self {
        Self {
            provider,
            task_contract,
            call_timeout,
            retries,
        }
    }

    pub async fn chain_id(&self) -> Result<u64, RpcError> {
        let provider = Arc::clone(&self.provider);
        run_with_retry(self.retries, self.call_timeout, "eth_chainId", || {
            let p = Arc::clone(&provider);
            async move { p.get_chain_id().await }
        })
        .await
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    async fn head_block(&self) -> Result<u64, RpcError> {
        let provider = Arc::clone(&self.provider);
        run_with_retry(self.retries, self.call_timeout, "eth_blockNumber", || {
            let p = Arc::clone(&provider);
            async move { p.get_block_number().await }
        })
        .await
    }

    async fn task_logs(&self, from: u64, to: u64) -> Result<Vec<Log>, RpcError> {
        let filter = task_filter(self.task_contract, from, to);
        let provider = Arc::clone(&self.provider);
        let context = format!("eth_getLogs([{from}, {to}])");
        let mut logs = run_with_retry(self.retries, self.call_timeout, &context, || {
            let p = Arc::clone(&provider);
            let filter = filter.clone();
            async move { p.get_logs(&filter).await }
        })
        .await?;
        sort_logs_canonical(&mut logs);
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::{sort_logs_canonical, task_filter};
    use crate::task::tests::{task_log, TASK_CONTRACT};
    use crate::task::NewTaskCreated;
    use alloy::rpc::types::FilterBlockOption;
    use alloy::sol_types::SolEvent;

    #[test]
    fn test_sort_logs_orders_by_block_then_index() {
        let mut logs = vec![
            task_log(240, 0, 8, "b.eth"),
            task_log(120, 5, 2, "c.eth"),
            task_log(120, 1, 7, "a.eth"),
        ];
        sort_logs_canonical(&mut logs);
        let order: Vec<(Option<u64>, Option<u64>)> = logs
            .iter()
            .map(|l| (l.block_number, l.log_index))
            .collect();
        assert_eq!(
            order,
            vec![(Some(120), Some(1)), (Some(120), Some(5)), (Some(240), Some(0))]
        );
    }

    #[test]
    fn test_task_filter_is_bounded_and_targets_selector() {
        let filter = task_filter(TASK_CONTRACT, 101, 200);
        match filter.block_option {
            FilterBlockOption::Range {
                from_block,
                to_block,
            } => {
                assert_eq!(from_block.and_then(|b| b.as_number()), Some(101));
                assert_eq!(to_block.and_then(|b| b.as_number()), Some(200));
            }
            other => panic!("expected range filter, got {other:?}"),
        }
        assert!(filter.address.matches(&TASK_CONTRACT));
        assert!(filter.topics[0].matches(&NewTaskCreated::SIGNATURE_HASH));
    }
}
