//! Payment DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::super::reservations::ReservationDto;
use crate::domain::Payment;

/// Open a payment attempt for a pending reservation
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct InitiatePaymentRequest {
    #[validate(length(min = 1))]
    pub reservation_id: String,
    /// `credit_card`, `debit_card`, `upi`, `net_banking` or `wallet`
    #[validate(length(min = 1))]
    pub method: String,
}

/// Gateway callback carrying the charge outcome
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ProcessPaymentRequest {
    #[validate(length(min = 1))]
    pub reservation_id: String,
    pub success: bool,
    /// Decline reason reported by the gateway
    #[validate(length(max = 255))]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentDto {
    pub id: String,
    pub reservation_id: String,
    pub amount: i64,
    pub method: String,
    /// `initiated`, `completed` or `failed`
    pub state: String,
    pub transaction_ref: String,
    pub gateway_message: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Payment> for PaymentDto {
    fn from(p: &Payment) -> Self {
        Self {
            id: p.id.to_string(),
            reservation_id: p.reservation_id.to_string(),
            amount: p.amount,
            method: p.method.as_str().to_string(),
            state: p.state.as_str().to_string(),
            transaction_ref: p.transaction_ref.clone(),
            gateway_message: p.gateway_message.clone(),
            paid_at: p.paid_at,
            created_at: p.created_at,
        }
    }
}

/// Outcome of an oracle-backed checkout
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutDto {
    pub payment: PaymentDto,
    pub reservation: ReservationDto,
}
