//! Port traits implemented by adapters.

mod collaborators;
mod gateway;
mod rates;
mod repository;

pub use collaborators::{AuditSink, KycDirectory, KycProfile, KycTier, Notifier};
pub use gateway::{GatewayConfig, PaymentGateway, PaymentHandle, PaymentRequest, WebhookNotice};
pub use rates::{RateProvider, RateSource};
pub use repository::{KnownDevice, TransferRepository, UserHistory};
