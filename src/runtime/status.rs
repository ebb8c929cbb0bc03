use crate::runtime::RuntimeArgs;
use crate::utils::config::{redact_url, Config};
use crate::utils::constants::MAX_LOG_CHUNK_SIZE;
use alloy::primitives::Address;

pub fn emit_config_status(config: &Config, args: &RuntimeArgs) {
    tracing::info!(
        "[OPS] Config resolved: rpc={} contract={:#x} pipeline={} chain_id={} poll_interval_ms={} chunk_size={} gas_limit={} failure_threshold={}",
        redact_url(&config.eth_rpc_url),
        config.task_contract,
        redact_url(&config.scoring_pipeline_url),
        config
            .chain_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "auto".to_string()),
        config.poll_interval.as_millis(),
        MAX_LOG_CHUNK_SIZE,
        config.response_gas_limit,
        config.consecutive_failure_threshold
    );
    tracing::info!(
        "[OPS] Timeouts: rpc_call_ms={} rpc_retries={} scoring_ms={} receipt_ms={} mode={}",
        config.rpc_call_timeout.as_millis(),
        config.rpc_retries,
        config.scoring_timeout.as_millis(),
        config.receipt_timeout.as_millis(),
        if args.run_once { "single-tick" } else { "continuous" }
    );
}

pub fn emit_startup_status(operator: Address, chain_id: u64, start_watermark: u64) {
    tracing::info!(
        "[STARTUP] operator={:#x} chain_id={} watermark={} (polling starts at block {})",
        operator,
        chain_id,
        start_watermark,
        start_watermark.saturating_add(1)
    );
    // The watermark is kept in memory only. Blocks before the startup head are never scanned.
    tracing::warn!(
        "[STARTUP] watermark initialized to current head; task events emitted while the operator was offline are not replayed"
    );
}
