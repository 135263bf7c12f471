//! # Remit Types
//!
//! Domain types and port traits for the transfer engine.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, Quote, Transaction, Payment, risk)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    Actor, Currency, FeeBreakdown, FxRate, GatewayKind, Money, Payment, PaymentId, PaymentStatus,
    Quote, QuoteId, Recipient, RiskAssessment, RiskFactor, RiskTier, Transaction, TransactionEvent,
    TransactionId, TransactionStatus, Transition,
};
pub use dto::*;
pub use error::{AppError, DomainError, GatewayError, RateError, RepoError};
pub use ports::{
    AuditSink, GatewayConfig, KnownDevice, KycDirectory, KycProfile, KycTier, Notifier,
    PaymentGateway, PaymentHandle, PaymentRequest, RateProvider, RateSource, TransferRepository,
    UserHistory, WebhookNotice,
};
