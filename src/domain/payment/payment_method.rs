//! Payment method aggregate and token selection policy.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PaymentMethodId, UserId};

/// How the payment method's tokens are vaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// One portable token valid at every processor.
    Network,
    /// Two processor-specific tokens, one per vault.
    DualVault,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Network => "network",
            TokenKind::DualVault => "dual_vault",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "network" => Some(TokenKind::Network),
            "dual_vault" => Some(TokenKind::DualVault),
            _ => None,
        }
    }
}

/// A stored, tokenized payment method. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: PaymentMethodId,
    pub user_id: UserId,
    pub token_kind: TokenKind,
    pub network_token: Option<String>,
    pub processor_a_token: Option<String>,
    pub processor_b_token: Option<String>,
    pub last_four: String,
}

impl PaymentMethod {
    /// Picks the token to present to `processor`.
    ///
    /// Preference order:
    /// 1. the network token (portable, keeps failover possible),
    /// 2. the vault token for the chosen processor,
    /// 3. any remaining vault token (best effort),
    /// 4. nothing - the attempt fails locally.
    pub fn token_for(&self, processor: &str) -> Option<&str> {
        if let Some(token) = non_empty(&self.network_token) {
            return Some(token);
        }

        let preferred = match processor {
            "processor_a" => non_empty(&self.processor_a_token),
            "processor_b" => non_empty(&self.processor_b_token),
            _ => None,
        };
        if let Some(token) = preferred {
            return Some(token);
        }

        non_empty(&self.processor_a_token).or_else(|| non_empty(&self.processor_b_token))
    }

    /// Whether any usable token is stored at all.
    pub fn has_token(&self) -> bool {
        non_empty(&self.network_token).is_some()
            || non_empty(&self.processor_a_token).is_some()
            || non_empty(&self.processor_b_token).is_some()
    }
}

fn non_empty(token: &Option<String>) -> Option<&str> {
    token.as_deref().filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(
        network: Option<&str>,
        a: Option<&str>,
        b: Option<&str>,
    ) -> PaymentMethod {
        PaymentMethod {
            id: PaymentMethodId::new(),
            user_id: UserId::new(),
            token_kind: if network.is_some() {
                TokenKind::Network
            } else {
                TokenKind::DualVault
            },
            network_token: network.map(String::from),
            processor_a_token: a.map(String::from),
            processor_b_token: b.map(String::from),
            last_four: "4242".to_string(),
        }
    }

    #[test]
    fn network_token_wins_regardless_of_processor() {
        let pm = method(Some("ntk_x"), Some("pa_tok"), Some("pb_tok"));
        assert_eq!(pm.token_for("processor_a"), Some("ntk_x"));
        assert_eq!(pm.token_for("processor_b"), Some("ntk_x"));
    }

    #[test]
    fn vault_token_matches_chosen_processor() {
        let pm = method(None, Some("pa_tok"), Some("pb_tok"));
        assert_eq!(pm.token_for("processor_a"), Some("pa_tok"));
        assert_eq!(pm.token_for("processor_b"), Some("pb_tok"));
    }

    #[test]
    fn falls_back_to_any_vault_token() {
        let pm = method(None, Some("pa_tok"), None);
        assert_eq!(pm.token_for("processor_b"), Some("pa_tok"));
    }

    #[test]
    fn empty_strings_do_not_count_as_tokens() {
        let pm = method(Some(""), Some(""), None);
        assert_eq!(pm.token_for("processor_a"), None);
        assert!(!pm.has_token());
    }

    #[test]
    fn no_tokens_yields_none() {
        let pm = method(None, None, None);
        assert_eq!(pm.token_for("processor_a"), None);
        assert!(!pm.has_token());
    }
}
