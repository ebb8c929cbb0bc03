/// Upper bound on blocks per `eth_getLogs` request imposed by the log provider.
pub const MAX_LOG_CHUNK_SIZE: u64 = 100;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;

/// Gas ceiling attached to every `respondToTask` transaction.
pub const DEFAULT_RESPONSE_GAS_LIMIT: u64 = 1_500_000;

/// Consecutive chain-access failures before the loud diagnostic fires.
pub const DEFAULT_CONSECUTIVE_FAILURE_THRESHOLD: u32 = 3;

pub const DEFAULT_RECEIPT_TIMEOUT_MS: u64 = 120_000;
pub const DEFAULT_SCORING_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_RPC_CALL_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_RPC_RETRIES: usize = 2;

/// Prefix of the message the operator signs for each response.
pub const RESPONSE_MESSAGE_PREFIX: &str = "Respond domain task";
