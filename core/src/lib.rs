//! AML risk screening for player transaction histories.
//!
//! The engine turns one account's monetary movements into structuring
//! episodes, netted withdrawal volumes, behavioral flags and a final risk
//! level and score. See `engine.rs` for the fixed stage order.

pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod escalation;
pub mod event;
pub mod netting;
pub mod patterns;
pub mod reconciliation;
pub mod store;
pub mod structuring;
pub mod types;
pub mod volume;

pub use config::{ConfigProvider, EngineConfig};
pub use engine::{ScreeningEngine, ScreeningReport};
pub use error::{EngineError, EngineResult};
pub use types::{RawTransaction, RiskAssessment, RiskLevel, StructuringEvent, Transaction};
