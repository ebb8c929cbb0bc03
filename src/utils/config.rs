use crate::error::{ConfigError, Result};
use crate::utils::constants::{
    DEFAULT_CONSECUTIVE_FAILURE_THRESHOLD, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RECEIPT_TIMEOUT_MS,
    DEFAULT_RESPONSE_GAS_LIMIT, DEFAULT_RPC_CALL_TIMEOUT_MS, DEFAULT_RPC_RETRIES,
    DEFAULT_SCORING_TIMEOUT_MS,
};
use alloy::primitives::Address;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub eth_rpc_url: String,
    pub operator_private_key: String,
    pub task_contract: Address,
    pub scoring_pipeline_url: String,
    pub chain_id: Option<u64>,
    pub poll_interval: Duration,
    pub response_gas_limit: u64,
    pub consecutive_failure_threshold: u32,
    pub receipt_timeout: Duration,
    pub scoring_timeout: Duration,
    pub rpc_call_timeout: Duration,
    pub rpc_retries: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("eth_rpc_url", &redact_url(&self.eth_rpc_url))
            .field("operator_private_key", &"<redacted>")
            .field("task_contract", &self.task_contract)
            .field("scoring_pipeline_url", &self.scoring_pipeline_url)
            .field("chain_id", &self.chain_id)
            .field("poll_interval", &self.poll_interval)
            .field("response_gas_limit", &self.response_gas_limit)
            .field(
                "consecutive_failure_threshold",
                &self.consecutive_failure_threshold,
            )
            .field("receipt_timeout", &self.receipt_timeout)
            .field("scoring_timeout", &self.scoring_timeout)
            .field("rpc_call_timeout", &self.rpc_call_timeout)
            .field("rpc_retries", &self.rpc_retries)
            .finish()
    }
}

/// Keeps scheme and host; API keys usually live in the path or query.
pub fn redact_url(raw: &str) -> String {
    match raw.parse::<reqwest::Url>() {
        Ok(url) => match url.host_str() {
            Some(host) => format!("{}://{}/...", url.scheme(), host),
            None => "<unparseable>".to_string(),
        },
        Err(_) => "<unparseable>".to_string(),
    }
}

fn validate_http_url(name: &str, raw: &str) -> Result<()> {
    let parsed = raw.parse::<reqwest::Url>().map_err(|e| {
        ConfigError::Invalid(format!("{name} must be a valid URL, got `{raw}`: {e}"))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Invalid(format!(
            "{name} must use http(s) scheme, got `{other}`"
        ))
        .into()),
    }
}

fn validate_private_key(raw: &str) -> Result<()> {
    let trimmed = raw.trim().trim_start_matches("0x");
    let hexish = trimmed.len() == 64 && trimmed.bytes().all(|b| b.is_ascii_hexdigit());
    if hexish {
        Ok(())
    } else {
        Err(ConfigError::Invalid(
            "OPERATOR_PRIVATE_KEY must be 32 bytes of hex (optionally 0x-prefixed)".to_string(),
        )
        .into())
    }
}

fn required(vars: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    vars(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::Missing(format!("{key} must be set")).into())
}

fn parse_ranged<T>(
    vars: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    range: std::ops::RangeInclusive<T>,
) -> Result<T>
where
    T: FromStr + PartialOrd + std::fmt::Display + Copy,
{
    let Some(raw) = vars(key).filter(|v| !v.trim().is_empty()) else {
        return Ok(default);
    };
    let value = raw.trim().parse::<T>().map_err(|_| {
        ConfigError::Invalid(format!("{key} must be a number, got `{}`", raw.trim()))
    })?;
    if !range.contains(&value) {
        return Err(ConfigError::Invalid(format!(
            "{key} must be within {}..={}, got {value}",
            range.start(),
            range.end()
        ))
        .into());
    }
    Ok(value)
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(&|key| env::var(key).ok())
    }

    pub fn from_lookup(vars: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let eth_rpc_url = required(vars, "ETH_RPC_URL")?;
        validate_http_url("ETH_RPC_URL", &eth_rpc_url)?;

        let operator_private_key = required(vars, "OPERATOR_PRIVATE_KEY")?;
        validate_private_key(&operator_private_key)?;

        let contract_raw = required(vars, "TASK_CONTRACT_ADDRESS")?;
        let task_contract = Address::from_str(&contract_raw).map_err(|e| {
            ConfigError::Invalid(format!(
                "TASK_CONTRACT_ADDRESS must be a 0x-prefixed address, got `{contract_raw}`: {e}"
            ))
        })?;
        if task_contract.is_zero() {
            return Err(ConfigError::Invalid(
                "TASK_CONTRACT_ADDRESS must not be the zero address".to_string(),
            )
            .into());
        }

        let scoring_pipeline_url = required(vars, "SCORING_PIPELINE_URL")?;
        validate_http_url("SCORING_PIPELINE_URL", &scoring_pipeline_url)?;

        let chain_id = match vars("CHAIN_ID").filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::Invalid(format!("CHAIN_ID must be a valid u64, got `{raw}`"))
            })?),
            None => None,
        };

        let poll_interval_ms = parse_ranged(
            vars,
            "POLL_INTERVAL_MS",
            DEFAULT_POLL_INTERVAL_MS,
            250..=600_000,
        )?;
        let response_gas_limit = parse_ranged(
            vars,
            "RESPONSE_GAS_LIMIT",
            DEFAULT_RESPONSE_GAS_LIMIT,
            21_000..=30_000_000,
        )?;
        let consecutive_failure_threshold = parse_ranged(
            vars,
            "CONSECUTIVE_FAILURE_THRESHOLD",
            DEFAULT_CONSECUTIVE_FAILURE_THRESHOLD,
            1..=1_000,
        )?;
        let receipt_timeout_ms = parse_ranged(
            vars,
            "RECEIPT_TIMEOUT_MS",
            DEFAULT_RECEIPT_TIMEOUT_MS,
            1_000..=3_600_000,
        )?;
        let scoring_timeout_ms = parse_ranged(
            vars,
            "SCORING_TIMEOUT_MS",
            DEFAULT_SCORING_TIMEOUT_MS,
            1_000..=3_600_000,
        )?;
        let rpc_call_timeout_ms = parse_ranged(
            vars,
            "RPC_CALL_TIMEOUT_MS",
            DEFAULT_RPC_CALL_TIMEOUT_MS,
            250..=300_000,
        )?;
        let rpc_retries = parse_ranged(vars, "RPC_RETRIES", DEFAULT_RPC_RETRIES, 0..=10)?;

        Ok(Self {
            eth_rpc_url,
            operator_private_key,
            task_contract,
            scoring_pipeline_url,
            chain_id,
            poll_interval: Duration::from_millis(poll_interval_ms),
            response_gas_limit,
            consecutive_failure_threshold,
            receipt_timeout: Duration::from_millis(receipt_timeout_ms),
            scoring_timeout: Duration::from_millis(scoring_timeout_ms),
            rpc_call_timeout: Duration::from_millis(rpc_call_timeout_ms),
            rpc_retries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use crate::error::{ConfigError, OperatorError};
    use std::collections::HashMap;
    use std::time::Duration;

    const KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    fn base_env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("ETH_RPC_URL", "https://rpc.example.org/v2/secret".to_string()),
            ("OPERATOR_PRIVATE_KEY", KEY.to_string()),
            (
                "TASK_CONTRACT_ADDRESS",
                "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            ),
            ("SCORING_PIPELINE_URL", "http://127.0.0.1:8080/score".to_string()),
        ])
    }

    fn load(env: &HashMap<&'static str, String>) -> crate::error::Result<Config> {
        Config::from_lookup(&|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults_match_reference_operator() {
        let cfg = load(&base_env()).expect("base env must load");
        assert_eq!(cfg.poll_interval, Duration::from_secs(10));
        assert_eq!(cfg.response_gas_limit, 1_500_000);
        assert_eq!(cfg.consecutive_failure_threshold, 3);
        assert_eq!(cfg.chain_id, None);
    }

    #[test]
    fn test_missing_rpc_url_is_reported() {
        let mut env = base_env();
        env.remove("ETH_RPC_URL");
        match load(&env) {
            Err(OperatorError::Config(ConfigError::Missing(msg))) => {
                assert!(msg.contains("ETH_RPC_URL"))
            }
            other => panic!("expected missing config, got {other:?}"),
        }
    }

    #[test]
    fn test_chunk_size_is_not_configurable() {
        // The provider's 100-block range limit is fixed; a stray key must not change anything.
        let mut env = base_env();
        env.insert("LOG_CHUNK_SIZE", "500".to_string());
        let rendered = format!("{:?}", load(&env).expect("unknown keys are ignored"));
        assert!(!rendered.contains("chunk"));
    }

    #[test]
    fn test_ws_rpc_url_is_rejected() {
        let mut env = base_env();
        env.insert("ETH_RPC_URL", "wss://rpc.example.org".to_string());
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_malformed_private_key_is_rejected() {
        let mut env = base_env();
        env.insert("OPERATOR_PRIVATE_KEY", "not-a-key".to_string());
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let cfg = load(&base_env()).expect("base env must load");
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains(&KEY[2..]));
        assert!(rendered.contains("rpc.example.org"));
    }
}
