use crate::error::{OperatorError, SubmissionError, ValuationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Node, network or pipeline unavailability. Expected to clear on its own.
    TransientInfrastructure,
    Other,
}

impl FailureClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TransientInfrastructure => "transient-infrastructure",
            Self::Other => "other",
        }
    }
}

const TRANSIENT_MARKERS: [&str; 12] = [
    "connection refused",
    "connection reset",
    "econnrefused",
    "econnreset",
    "timed out",
    "timeout",
    "network",
    "dns error",
    "502",
    "503",
    "504",
    "429",
];

fn looks_transient(message: &str) -> bool {
    let msg = message.to_ascii_lowercase();
    TRANSIENT_MARKERS.iter().any(|needle| msg.contains(needle))
}

pub fn classify(err: &OperatorError) -> FailureClass {
    if err.is_chain_access() {
        return FailureClass::TransientInfrastructure;
    }
    match err {
        OperatorError::Valuation(ValuationError::Transport(msg))
        | OperatorError::Submission(SubmissionError::Transport(msg))
        | OperatorError::Submission(SubmissionError::Confirmation(msg))
            if looks_transient(msg) =>
        {
            FailureClass::TransientInfrastructure
        }
        _ => FailureClass::Other,
    }
}

/// Counts consecutive chain-access failures and decides when to escalate.
///
/// The diagnostic fires when the streak reaches the threshold and again every
/// further `threshold` failures while the outage lasts. Any successful tick
/// resets the streak.
#[derive(Debug)]
pub struct ErrorClassifier {
    threshold: u32,
    consecutive: u32,
    escalations: u64,
}

impl ErrorClassifier {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive: 0,
            escalations: 0,
        }
    }

    /// Records a chain-access failure. Returns `true` when the threshold
    /// diagnostic was emitted for this failure.
    pub fn record_chain_failure(&mut self, err: &OperatorError) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        let escalate = self.consecutive % self.threshold == 0;
        if escalate {
            self.escalations = self.escalations.saturating_add(1);
            tracing::error!(
                "[OPS] {} consecutive chain-access failures (threshold {}), class={}; latest: {}",
                self.consecutive,
                self.threshold,
                classify(err).as_str(),
                crate::utils::error::compact_error(err)
            );
        }
        escalate
    }

    pub fn record_success(&mut self) {
        if self.consecutive >= self.threshold {
            tracing::info!(
                "[OPS] chain access recovered after {} consecutive failures",
                self.consecutive
            );
        }
        self.consecutive = 0;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive
    }

    pub fn escalations(&self) -> u64 {
        self.escalations
    }
}
