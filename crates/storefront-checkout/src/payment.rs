//! # Payment Authorization
//!
//! The payment authorizer is an external capability: slow, unreliable and
//! owned by someone else. The orchestrator calls it once per attempt and
//! never retries.
//!
//! ```text
//! authorize(amount, method) ──► Ok(Authorization { approved: true,  transaction_id })
//!                           ──► Ok(Authorization { approved: false, transaction_id })  declined
//!                           ──► Err(PaymentError::Gateway(..))                         no answer
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::error::PaymentError;
use storefront_core::Money;

/// Gateway answer for one authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub approved: bool,
    pub transaction_id: String,
}

/// Capability that charges a customer.
///
/// Implementations must be idempotent per transaction id if they retry
/// internally; callers never retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentAuthorizer: Send + Sync {
    async fn authorize(&self, amount: Money, method: String) -> Result<Authorization, PaymentError>;
}

/// In-process stand-in for a card processor.
///
/// Sleeps for `latency`, then declines with probability `decline_rate`.
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    latency: Duration,
    decline_rate: f64,
}

impl SimulatedGateway {
    /// Creates a gateway; `decline_rate` is clamped to `0.0..=1.0`.
    pub fn new(latency: Duration, decline_rate: f64) -> Self {
        let decline_rate = if decline_rate.is_nan() {
            0.0
        } else {
            decline_rate.clamp(0.0, 1.0)
        };

        SimulatedGateway {
            latency,
            decline_rate,
        }
    }

    /// No latency, never declines.
    pub fn always_approve() -> Self {
        Self::new(Duration::ZERO, 0.0)
    }

    /// No latency, always declines.
    pub fn always_decline() -> Self {
        Self::new(Duration::ZERO, 1.0)
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn decline_rate(&self) -> f64 {
        self.decline_rate
    }
}

impl Default for SimulatedGateway {
    /// About a second per call and a 95% approval rate.
    fn default() -> Self {
        Self::new(Duration::from_millis(1000), 0.05)
    }
}

#[async_trait]
impl PaymentAuthorizer for SimulatedGateway {
    async fn authorize(&self, amount: Money, method: String) -> Result<Authorization, PaymentError> {
        debug!(amount = %amount, method = %method, "Authorizing payment");

        if !amount.is_positive() {
            return Err(PaymentError::Gateway(format!(
                "amount must be positive, got {amount}"
            )));
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let approved = !rand::thread_rng().gen_bool(self.decline_rate);
        let transaction_id = generate_transaction_id();

        if approved {
            info!(transaction_id = %transaction_id, amount = %amount, "Payment approved");
        } else {
            warn!(transaction_id = %transaction_id, amount = %amount, "Payment declined");
        }

        Ok(Authorization {
            approved,
            transaction_id,
        })
    }
}

/// Generates a gateway transaction id: `TXN-<unix millis>-<9 lowercase alphanumerics>`.
pub fn generate_transaction_id() -> String {
    format!(
        "TXN-{}-{}",
        Utc::now().timestamp_millis(),
        random_suffix(9).to_lowercase()
    )
}

pub(crate) fn random_suffix(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
