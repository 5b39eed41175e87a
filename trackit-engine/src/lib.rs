//! TrackIT Engine - journey ledger and verification engine
//!
//! Client-side protocol for producing and consuming trustworthy supply
//! chain journeys from an external distributed ledger:
//! - [`gateway`] - the only component performing ledger I/O, as a trait
//!   with a JSON-RPC implementation ([`rpc`]) and an in-memory mock
//! - [`append`] - validated event submission and atomic registration
//! - [`assembly`] - query/filter/dedupe/order pipeline producing verified
//!   timelines
//! - [`verify`] - the consumer-facing entry point
//!
//! All durable state lives in the ledger; the engine holds no cross-call
//! state and imposes no locking beyond request-scoped values, so any
//! number of appenders and verifiers can run concurrently.

pub mod append;
pub mod assembly;
pub mod config;
pub mod error;
pub mod gateway;
pub mod rpc;
pub mod verify;

pub use append::{AcceptedEvent, AppendProtocol, AppendRequest, RegisteredProduct, Registration};
pub use assembly::{AssembledJourney, JourneyAssembler};
pub use config::{LedgerConfig, RetryConfig};
pub use error::{AppendError, AssemblyError, QueryError, SubmitError, VerifyError};
pub use gateway::{
    CostEstimate, EventId, LedgerGateway, LedgerObject, LedgerReceipt, LedgerTransaction,
    MockLedgerGateway, RawLedgerEvent, TransactionSummary,
};
pub use rpc::RpcLedgerGateway;
pub use verify::{VerificationFront, VerificationView};
