use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use super::domain::{PaymentAttempt, PaymentReceipt};

/// Settles payment for resume enhancement.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn settle(&self, attempt: &PaymentAttempt) -> Result<PaymentReceipt, PaymentError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment declined: {0}")]
    Declined(String),
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),
}

/// Stand-in gateway: waits a fixed delay and always confirms. There is no real settlement
/// contract behind it.
pub struct SimulatedPaymentGateway {
    delay: Duration,
    sequence: AtomicU64,
}

impl SimulatedPaymentGateway {
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(1500);

    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            sequence: AtomicU64::new(1),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for SimulatedPaymentGateway {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}

#[async_trait]
impl PaymentGateway for SimulatedPaymentGateway {
    async fn settle(&self, attempt: &PaymentAttempt) -> Result<PaymentReceipt, PaymentError> {
        info!(
            method = attempt.method.label(),
            delay_ms = self.delay.as_millis() as u64,
            "processing simulated payment"
        );
        tokio::time::sleep(self.delay).await;

        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        Ok(PaymentReceipt {
            reference: format!("sim-{id:06}"),
            method: attempt.method,
        })
    }
}
