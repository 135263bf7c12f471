//! Pure domain types for the transfer engine.

mod money;
mod payment;
mod quote;
mod risk;
mod transaction;

pub use money::{Currency, Money};
pub use payment::{GatewayKind, Payment, PaymentId, PaymentStatus};
pub use quote::{FeeBreakdown, FxRate, Quote, QuoteId};
pub use risk::{RiskAssessment, RiskFactor, RiskTier};
pub use transaction::{
    Actor, Recipient, Transaction, TransactionEvent, TransactionId, TransactionStatus, Transition,
};
