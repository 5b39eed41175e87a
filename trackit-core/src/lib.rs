//! TrackIT Core - supply chain journey domain types
//!
//! This crate provides the domain model shared by the journey engine and its
//! consumers:
//! - Product identifiers and their generation scheme
//! - Verification references (the scannable pointer back to an identifier)
//! - Product records, journey events, and timeline entries
//!
//! Everything here is plain data: no I/O, no async, no ledger knowledge.
//! The ledger protocol lives in `trackit-engine`.

pub mod constants;
pub mod ident;
pub mod types;

pub use ident::{ProductId, ReferenceError, VerificationReference};
pub use types::{
    JourneyEvent, JourneyStage, ProductCondition, ProductRecord, Timeline, TimelineEntry,
};
