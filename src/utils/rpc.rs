use crate::error::RpcError;
use crate::utils::error::compact_error_message;
use alloy::providers::{ProviderBuilder, RootProvider};
use alloy::transports::http::Http;
use reqwest::Client;
use std::future::Future;
use tokio::time::{sleep, timeout, Duration};

pub type HttpProvider = RootProvider<Http<Client>>;

const RPC_ERR_MAX_LEN: usize = 260;
const RETRY_BACKOFF_BASE_MS: u64 = 100;
const RETRY_BACKOFF_CAP_MS: u64 = 1_800;

pub fn connect_http(rpc_url: &str) -> Result<HttpProvider, RpcError> {
    let url = rpc_url.parse::<reqwest::Url>().map_err(|e| RpcError::InvalidUrl {
        url: crate::utils::config::redact_url(rpc_url),
        reason: format!("{e}"),
    })?;
    Ok(ProviderBuilder::new().on_http(url))
}

/// Errors the node will return again no matter how often the call is repeated.
pub fn is_retryable_rpc_error(message: &str) -> bool {
    let msg = message.to_ascii_lowercase();
    let non_retryable = [
        "method not found",
        "-32601",
        "invalid params",
        "-32602",
        "execution reverted",
        "parse error",
        "-32700",
        "query returned more than",
        "block range",
    ];
    !non_retryable.iter().any(|needle| msg.contains(needle))
}

pub fn is_rate_limited_rpc_error(message: &str) -> bool {
    let msg = message.to_ascii_lowercase();
    msg.contains("429")
        || msg.contains("rate limit")
        || msg.contains("too many requests")
        || msg.contains("compute units per second")
}

pub fn bounded_exponential_backoff_ms(base_ms: u64, streak: u32, cap_ms: u64) -> u64 {
    if base_ms == 0 {
        return 0;
    }
    let clamped = streak.min(8);
    base_ms
        .saturating_mul(1u64 << clamped)
        .min(cap_ms.max(base_ms))
}

fn retry_backoff_ms(attempt: usize, rate_limited: bool) -> u64 {
    let streak = attempt.min(u32::MAX as usize) as u32;
    let backoff = bounded_exponential_backoff_ms(RETRY_BACKOFF_BASE_MS, streak, RETRY_BACKOFF_CAP_MS);
    if rate_limited {
        backoff.saturating_mul(2)
    } else {
        backoff
    }
}

/// Runs `op` up to `retries + 1` times, bounding each attempt by `call_timeout`.
///
/// Only transport-level hiccups are retried here; once attempts are exhausted the
/// failure is surfaced as [`RpcError::Transport`] and the caller decides what a
/// chain-access failure means for its unit of work.
pub async fn run_with_retry<T, E, Op, Fut>(
    retries: usize,
    call_timeout: Duration,
    context: &str,
    mut op: Op,
) -> Result<T, RpcError>
where
    E: std::fmt::Display,
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = retries.saturating_add(1);
    let mut attempt = 1usize;

    loop {
        let (message, retryable, rate_limited) = match timeout(call_timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => {
                let message = compact_error_message(&err.to_string(), RPC_ERR_MAX_LEN);
                let retryable = is_retryable_rpc_error(&message);
                let rate_limited = is_rate_limited_rpc_error(&message);
                (message, retryable, rate_limited)
            }
            Err(_) => (
                format!("timed out after {}ms", call_timeout.as_millis()),
                true,
                false,
            ),
        };

        if !retryable || attempt >= max_attempts {
            return Err(RpcError::Transport(format!(
                "{context} failed on attempt {attempt}/{max_attempts}: {message}"
            )));
        }
        tracing::debug!(
            "[CHAIN] {} attempt {}/{} failed, retrying: {}",
            context,
            attempt,
            max_attempts,
            message
        );
        sleep(Duration::from_millis(retry_backoff_ms(attempt, rate_limited))).await;
        attempt = attempt.saturating_add(1);
    }
}
