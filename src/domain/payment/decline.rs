//! Decline classification: which failures are worth retrying.

use serde::{Deserialize, Serialize};

/// Classification of a failed charge by retry eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclineType {
    /// Temporary condition; the scheduler will retry.
    Soft,
    /// Permanent condition; never retried.
    Hard,
}

impl DeclineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclineType::Soft => "soft",
            DeclineType::Hard => "hard",
        }
    }
}

/// Error codes that indicate a permanent decline.
const HARD_DECLINES: &[&str] = &[
    "card_declined",
    "invalid_card",
    "expired_card",
    "card_not_supported",
    "invalid_account",
    "currency_not_supported",
    "fraud_detected",
    "stolen_card",
    "lost_card",
    "pickup_card",
    "invalid_amount",
    "do_not_honor",
    "account_closed",
    "insufficient_permission",
];

/// Error codes that indicate a transient decline.
const SOFT_DECLINES: &[&str] = &[
    "insufficient_funds",
    "processing_error",
    "try_again_later",
    "temporary_failure",
    "network_error",
    "timeout",
    "rate_limit_exceeded",
    "service_unavailable",
    "processor_unavailable",
    "CHARGE_ERROR",
    "ORCHESTRATOR_ERROR",
];

/// Classifies a processor error code as a soft or hard decline.
///
/// Unknown codes classify as soft: retrying a charge that turns out to
/// be permanently declined wastes attempts, abandoning one that was
/// transient loses revenue.
pub fn classify_decline(error_code: &str) -> DeclineType {
    if HARD_DECLINES.contains(&error_code) {
        return DeclineType::Hard;
    }
    if SOFT_DECLINES.contains(&error_code) {
        return DeclineType::Soft;
    }
    DeclineType::Soft
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_declines_classify_hard() {
        for code in ["expired_card", "fraud_detected", "do_not_honor", "stolen_card"] {
            assert_eq!(classify_decline(code), DeclineType::Hard, "{code}");
        }
    }

    #[test]
    fn soft_declines_classify_soft() {
        for code in [
            "insufficient_funds",
            "timeout",
            "processor_unavailable",
            "CHARGE_ERROR",
            "ORCHESTRATOR_ERROR",
        ] {
            assert_eq!(classify_decline(code), DeclineType::Soft, "{code}");
        }
    }

    #[test]
    fn unknown_codes_default_to_soft() {
        assert_eq!(classify_decline("some_new_code"), DeclineType::Soft);
        assert_eq!(classify_decline(""), DeclineType::Soft);
    }

    #[test]
    fn classification_is_case_sensitive() {
        // Processor codes are lowercase; the two internal codes are not.
        assert_eq!(classify_decline("EXPIRED_CARD"), DeclineType::Soft);
    }
}
