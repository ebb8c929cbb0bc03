//! Operator binary: polls the task contract and answers every new valuation task once.

use std::sync::Arc;

use valuation_operator::chain::{AlloyChainClient, ChainClient};
use valuation_operator::error::RpcError;
use valuation_operator::poller::{PollerSettings, TaskPoller};
use valuation_operator::runtime::{emit_config_status, emit_startup_status, parse_runtime_args};
use valuation_operator::scheduler::PollScheduler;
use valuation_operator::scoring::HttpScoringInvoker;
use valuation_operator::submitter::{parse_operator_key, AlloyResponseSubmitter};
use valuation_operator::utils::blackbox::{self, EventKind};
use valuation_operator::utils::config::{redact_url, Config};
use valuation_operator::utils::rpc::connect_http;

async fn resolve_chain_id(chain: &AlloyChainClient, configured: Option<u64>) -> anyhow::Result<u64> {
    let actual = chain.chain_id().await?;
    match configured {
        Some(expected) if expected != actual => {
            Err(RpcError::ChainIdMismatch { expected, actual }.into())
        }
        _ => Ok(actual),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load `.env` before anything reads the environment.
    valuation_operator::utils::env_guard::harden_env_setup();
    let runtime_args = parse_runtime_args()?;

    match std::env::var("RUST_LOG") {
        Ok(val) => println!("[STARTUP] RUST_LOG is set to: '{}'", val),
        Err(_) => println!("[STARTUP] RUST_LOG is unset."),
    }
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        println!("[STARTUP] RUST_LOG invalid or unset; defaulting to 'info'");
        tracing_subscriber::EnvFilter::new("info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    println!("[STARTUP] Tracing initialized.");

    blackbox::install_panic_hook_once();
    println!("[STARTUP] Panic hook installed.");

    let config = Config::load()?;
    emit_config_status(&config, &runtime_args);
    if runtime_args.explain_config {
        tracing::info!("[OPS] OPERATOR_EXPLAIN_CONFIG=true requested; configuration resolved.");
        return Ok(());
    }

    tracing::info!(
        "[STARTUP] Connecting to ETH_RPC_URL: {}",
        redact_url(&config.eth_rpc_url)
    );
    let provider = Arc::new(connect_http(&config.eth_rpc_url)?);
    let chain = Arc::new(AlloyChainClient::new(
        Arc::clone(&provider),
        config.task_contract,
        config.rpc_call_timeout,
        config.rpc_retries,
    ));
    let chain_id = resolve_chain_id(&chain, config.chain_id).await?;

    let signer = parse_operator_key(&config.operator_private_key)?;
    let submitter = Arc::new(AlloyResponseSubmitter::new(
        Arc::clone(&provider),
        signer,
        config.task_contract,
        chain_id,
        config.response_gas_limit,
        config.receipt_timeout,
    ));
    let scoring = Arc::new(HttpScoringInvoker::new(
        config.scoring_pipeline_url.clone(),
        config.scoring_timeout,
    )?);

    let start_watermark = chain.head_block().await?;
    emit_startup_status(submitter.operator_address(), chain_id, start_watermark);
    blackbox::record(
        EventKind::Startup,
        format!("chain_id={chain_id} watermark={start_watermark}"),
    );

    let mut poller = TaskPoller::new(
        chain,
        scoring,
        submitter,
        PollerSettings {
            consecutive_failure_threshold: config.consecutive_failure_threshold,
        },
        start_watermark,
    );
    let scheduler = PollScheduler::new(config.poll_interval);

    if runtime_args.run_once {
        if let Some(outcome) = scheduler.fire(&mut poller).await {
            tracing::info!("[OPS] single tick finished: {:?}", outcome);
        }
        return Ok(());
    }

    tracing::info!(
        "[OPS] Polling every {}ms from block {}",
        scheduler.interval().as_millis(),
        start_watermark.saturating_add(1)
    );
    tokio::select! {
        _ = scheduler.run(&mut poller) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("[OPS] Received Ctrl+C; stopping after the current await point.");
            blackbox::record(EventKind::Signal, "ctrl_c_received");
            if let Some(path) = blackbox::dump("ctrl_c") {
                tracing::info!("[OPS] blackbox written to {}", path.display());
            }
        }
    }

    tracing::info!(
        "[OPS] Operator stopped at watermark {} ({} tasks processed).",
        poller.watermark(),
        poller.dedup().processed_len()
    );
    Ok(())
}
