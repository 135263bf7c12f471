//! # Remit Engine
//!
//! Application services for the transfer engine: quoting, risk
//! screening, the transaction lifecycle, payment orchestration, webhook
//! reconciliation, and the inbound HTTP adapter.
//!
//! Everything here is orchestration over the ports in `remit-types`;
//! infrastructure lives in the adapter crates and is injected.

pub mod fees;
pub mod inbound;
pub mod openapi;
pub mod quotes;
pub mod reaper;
pub mod reconciler;
pub mod risk;
pub mod service;


pub use fees::{FeeCalculator, FeeSchedule, Surcharge};
pub use quotes::QuoteService;
pub use reaper::Reaper;
pub use reconciler::WebhookReconciler;
pub use risk::{RiskConfig, RiskScorer, UserContext};
pub use service::{CreateOutcome, TransferService};
