//! User-facing message mapping for processor error codes.
//!
//! Keys are the same canonical lowercase codes the decline classifier
//! speaks, so the mapping applies directly to what processors return.

/// Maps a processor error code to the message shown to the cardholder.
///
/// The underlying code is still returned alongside for machine
/// consumers; this mapping only shapes the human-readable text.
pub fn user_message_for(error_code: &str) -> &'static str {
    match error_code {
        "card_declined" => "Your card was declined. Please try a different payment method.",
        "insufficient_funds" => {
            "Insufficient funds. Please try again later or use a different card."
        }
        "expired_card" => "Your card has expired. Please update your payment method.",
        "network_error" => "Network error. Please try again in a few moments.",
        "processor_unavailable" => {
            "Payment system temporarily unavailable. Please try again later."
        }
        "fraud_detected" => "Payment declined for security reasons. Please contact your bank.",
        _ => "Payment could not be processed. Please try again.",
    }
}

/// Message used when both processors fail at the transport level.
pub const PROCESSORS_UNAVAILABLE_MESSAGE: &str =
    "Payment processing temporarily unavailable. Please try again in a few minutes.";
