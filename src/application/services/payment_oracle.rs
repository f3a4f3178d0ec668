//! Payment oracle port
//!
//! The engine never talks to a gateway itself; it asks an oracle for a
//! verdict and records it.

use async_trait::async_trait;
use tracing::info;

use crate::domain::{Payment, PaymentVerdict};

#[async_trait]
pub trait PaymentOracle: Send + Sync {
    /// Charge `payment` and report the outcome.
    async fn charge(&self, payment: &Payment) -> PaymentVerdict;
}

/// Stand-in gateway that answers with a fixed verdict
#[derive(Debug, Clone)]
pub struct SimulatedPaymentOracle {
    approve: bool,
}

impl SimulatedPaymentOracle {
    pub fn new(approve: bool) -> Self {
        Self { approve }
    }

    pub fn approving() -> Self {
        Self::new(true)
    }

    pub fn declining() -> Self {
        Self::new(false)
    }
}

impl Default for SimulatedPaymentOracle {
    fn default() -> Self {
        Self::approving()
    }
}

#[async_trait]
impl PaymentOracle for SimulatedPaymentOracle {
    async fn charge(&self, payment: &Payment) -> PaymentVerdict {
        let verdict = PaymentVerdict::from_success(self.approve);
        info!(
            transaction_ref = %payment.transaction_ref,
            amount = payment.amount,
            method = payment.method.as_str(),
            verdict = verdict.label(),
            "💳 Simulated payment processed"
        );
        verdict
    }
}
