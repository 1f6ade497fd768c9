//! Payment gateway adapter with keyed-hash confirmation verification.

use crate::domain::money::Amount;
use crate::domain::ports::{PaymentGateway, PaymentIntent};
use crate::error::Result;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Gateway adapter signing and verifying confirmations with HMAC-SHA256 over
/// `intent_id|payment_id`. Stateless apart from its key; verification is
/// deterministic, so a `false` result always means reject.
pub struct HmacGateway {
    secret_key: String,
    currency: String,
}

impl HmacGateway {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            currency: "INR".to_string(),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// The signature the gateway attaches to a completion callback for this
    /// `(intent_id, payment_id)` pair. Used by webhook simulation and test
    /// fixtures.
    pub fn sign(&self, intent_id: &str, payment_id: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(intent_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

#[async_trait]
impl PaymentGateway for HmacGateway {
    async fn create_intent(&self, amount: Amount) -> Result<PaymentIntent> {
        // Every call mints a fresh id, so a retried initiation never collides
        // with an earlier intent.
        let intent_id = format!("intent_{}", Uuid::new_v4().simple());
        debug!(%intent_id, %amount, "payment intent created");
        Ok(PaymentIntent {
            intent_id,
            amount,
            currency: self.currency.clone(),
        })
    }

    fn verify_signature(&self, intent_id: &str, payment_id: &str, signature: &str) -> bool {
        let expected = self.sign(intent_id, payment_id);
        let provided = signature.trim();

        // Constant-time comparison to prevent timing attacks.
        if expected.len() != provided.len() {
            return false;
        }
        expected
            .as_bytes()
            .iter()
            .zip(provided.as_bytes().iter())
            .fold(0, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}
