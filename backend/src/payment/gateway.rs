//! Card gateway seam
//!
//! [`SimulatedCardGateway`] stands in for a real processor. Two well-known
//! test numbers trigger the failure paths; every other card is charged.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use thiserror::Error;

use super::CardDetails;

/// Card that is always declined for lack of funds
pub const DECLINED_CARD: &str = "4000000000000002";
/// Card whose charge never reaches the processor
pub const UNREACHABLE_CARD: &str = "4000000000000127";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("{0}")]
    Declined(String),

    #[error("{0}")]
    Unavailable(String),
}

/// Successful charge
#[derive(Debug, Clone)]
pub struct ChargeReceipt {
    pub transaction_id: String,
    pub charged_at: DateTime<Utc>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &str;

    async fn charge(
        &self,
        card: &CardDetails,
        amount: i64,
        currency: &str,
        at: DateTime<Utc>,
    ) -> Result<ChargeReceipt, GatewayError>;
}

/// Gateway that never talks to a processor
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedCardGateway;

impl SimulatedCardGateway {
    /// `TXN_<unix millis>_<9 uppercase alphanumerics>`
    fn transaction_id(at: DateTime<Utc>) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(9)
            .map(|c| char::from(c).to_ascii_uppercase())
            .collect();
        format!("TXN_{}_{}", at.timestamp_millis(), suffix)
    }
}

#[async_trait]
impl PaymentGateway for SimulatedCardGateway {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn charge(
        &self,
        card: &CardDetails,
        amount: i64,
        currency: &str,
        at: DateTime<Utc>,
    ) -> Result<ChargeReceipt, GatewayError> {
        match card.number.as_str() {
            DECLINED_CARD => Err(GatewayError::Declined("Insufficient funds".to_string())),
            UNREACHABLE_CARD => Err(GatewayError::Unavailable(
                "Card processor unreachable".to_string(),
            )),
            _ => {
                let transaction_id = Self::transaction_id(at);
                tracing::info!(
                    transaction_id = %transaction_id,
                    amount,
                    currency,
                    card_last4 = %card.last4(),
                    "Simulated card charge succeeded"
                );
                Ok(ChargeReceipt {
                    transaction_id,
                    charged_at: at,
                })
            }
        }
    }
}
