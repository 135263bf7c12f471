//! # Remit Gateways
//!
//! Concrete payment-provider adapters implementing the `PaymentGateway`
//! port: card network, EFT, and open banking. Each adapter owns its
//! provider's wire format and webhook signature scheme; the engine only
//! ever sees the normalized port types.

mod card;
mod eft;
mod open_banking;
mod registry;
pub mod retry;
pub mod signature;

pub use card::CardGateway;
pub use eft::EftGateway;
pub use open_banking::OpenBankingGateway;
pub use registry::GatewayRegistry;
pub use retry::RetryPolicy;
