//! Payment attempt entity

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::{HolderId, PaymentId, ReservationId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Upi,
    NetBanking,
    Wallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreditCard => "credit_card",
            Self::DebitCard => "debit_card",
            Self::Upi => "upi",
            Self::NetBanking => "net_banking",
            Self::Wallet => "wallet",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "credit_card" => Some(Self::CreditCard),
            "debit_card" => Some(Self::DebitCard),
            "upi" => Some(Self::Upi),
            "net_banking" => Some(Self::NetBanking),
            "wallet" => Some(Self::Wallet),
            _ => None,
        }
    }
}

/// Lifecycle of one payment attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    Initiated,
    Completed,
    Failed,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initiated" => Some(Self::Initiated),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// What the payment oracle answered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum PaymentVerdict {
    Approved,
    Declined { reason: String },
}

impl PaymentVerdict {
    pub fn from_success(success: bool) -> Self {
        if success {
            Self::Approved
        } else {
            Self::Declined {
                reason: "Payment failed".to_string(),
            }
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Declined { .. } => "declined",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub reservation_id: ReservationId,
    pub holder_id: HolderId,
    pub amount: i64,
    pub method: PaymentMethod,
    pub state: PaymentState,
    /// Gateway-facing reference, `TXN<millis><suffix>`
    pub transaction_ref: String,
    pub gateway_message: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn initiate(
        reservation_id: ReservationId,
        holder_id: HolderId,
        amount: i64,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentId::generate(),
            reservation_id,
            holder_id,
            amount,
            method,
            state: PaymentState::Initiated,
            transaction_ref: transaction_ref(now),
            gateway_message: None,
            paid_at: None,
            created_at: now,
        }
    }

    /// Outcome of recording `verdict` at `now`.
    pub fn settle(&mut self, verdict: &PaymentVerdict, now: DateTime<Utc>) {
        match verdict {
            PaymentVerdict::Approved => {
                self.state = PaymentState::Completed;
                self.paid_at = Some(now);
                self.gateway_message = Some("Payment completed successfully".to_string());
            }
            PaymentVerdict::Declined { reason } => {
                self.state = PaymentState::Failed;
                self.gateway_message = Some(reason.clone());
            }
        }
    }
}

fn transaction_ref(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("TXN{}{}", now.timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Payment {
        Payment::initiate(
            ReservationId::generate(),
            "user-1".into(),
            400,
            PaymentMethod::Upi,
            Utc::now(),
        )
    }

    #[test]
    fn new_payment_is_initiated_with_reference() {
        let p = sample();
        assert_eq!(p.state, PaymentState::Initiated);
        assert!(p.transaction_ref.starts_with("TXN"));
        assert_eq!(p.transaction_ref.len(), 3 + 13 + 9);
        assert!(p.paid_at.is_none());
    }

    #[test]
    fn approval_stamps_paid_at() {
        let mut p = sample();
        let now = Utc::now();
        p.settle(&PaymentVerdict::Approved, now);
        assert_eq!(p.state, PaymentState::Completed);
        assert_eq!(p.paid_at, Some(now));
    }

    #[test]
    fn decline_keeps_reason() {
        let mut p = sample();
        p.settle(
            &PaymentVerdict::Declined {
                reason: "card expired".into(),
            },
            Utc::now(),
        );
        assert_eq!(p.state, PaymentState::Failed);
        assert_eq!(p.gateway_message.as_deref(), Some("card expired"));
        assert!(p.paid_at.is_none());
    }

    #[test]
    fn method_names_match_wire_format() {
        assert_eq!(PaymentMethod::parse("net_banking"), Some(PaymentMethod::NetBanking));
        assert_eq!(
            serde_json::to_string(&PaymentMethod::CreditCard).unwrap(),
            "\"credit_card\""
        );
    }
}
