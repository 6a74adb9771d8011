//! Card payments, payment intents and payment history

mod gateway;
mod model;
mod service;

pub use gateway::{ChargeReceipt, GatewayError, PaymentGateway, SimulatedCardGateway};
pub use model::*;
pub use service::PaymentService;
