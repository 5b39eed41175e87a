//! Ledger Gateway
//!
//! The only surface in the workspace that talks to the distributed ledger.
//! Defines the gateway trait plus the wire types shared by every
//! implementation:
//! - `RpcLedgerGateway` (module `rpc`) - JSON-RPC client for a remote node
//! - `MockLedgerGateway` (below) - in-memory ledger for tests and demos

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use trackit_core::{JourneyEvent, ProductRecord};

use crate::config::LedgerConfig;
use crate::error::{QueryError, SubmitError};

/// Stable per-event identity assigned by the ledger
///
/// Transaction digest plus the event's index within that transaction.
/// This pair is the deduplication key: re-querying the ledger must never
/// double-count an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    /// Digest of the accepting transaction
    pub tx_digest: String,
    /// Index of the event within the transaction
    pub event_seq: u64,
}

/// One emitted event as returned by a typed event query
///
/// `timestamp_ms` is the ledger's acceptance timestamp, not the
/// submitter's clock; it is the authoritative ordering key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLedgerEvent {
    /// Ledger-assigned event identity
    pub id: EventId,
    /// Fully qualified on-ledger event type
    pub event_type: String,
    /// Ledger-assigned acceptance timestamp in milliseconds
    pub timestamp_ms: u64,
    /// Event payload as emitted by the module
    pub parsed: serde_json::Value,
}

/// A transaction the gateway can submit
///
/// Registration packs the product record and its first event into one
/// transaction: the ledger applies both or neither, so a partially
/// registered product is never observable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerTransaction {
    /// Create a product record and its first "Registered" event atomically
    RegisterProduct {
        record: ProductRecord,
        first_event: JourneyEvent,
    },
    /// Append one journey event to an existing product
    RecordJourneyEvent { event: JourneyEvent },
}

impl LedgerTransaction {
    /// Encode to the submit payload: canonical JSON wrapped in base64,
    /// standing in for the node's binary transaction format.
    pub fn encode(&self) -> Result<String, SubmitError> {
        let bytes = serde_json::to_vec(self)
            .map_err(|e| SubmitError::Rejected(format!("unserializable transaction: {e}")))?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

/// Receipt for a durably accepted transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerReceipt {
    /// Digest of the accepted transaction
    pub tx_digest: String,
    /// Ledger acceptance timestamp in milliseconds
    pub timestamp_ms: u64,
}

/// A shared on-ledger object with its content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerObject {
    pub object_id: String,
    pub version: u64,
    pub content: serde_json::Value,
    /// Node-provided binary encoding of the object, base64, when requested
    pub bcs: Option<String>,
}

/// Summary of one accepted transaction, as returned by an address
/// history query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub tx_digest: String,
    pub timestamp_ms: u64,
}

/// Resource cost reported by a dry run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostEstimate {
    pub computation_cost: u64,
    pub storage_cost: u64,
}

impl CostEstimate {
    pub fn total(&self) -> u64 {
        self.computation_cost + self.storage_cost
    }
}

/// Gateway to the distributed ledger
///
/// The append protocol and assembly pipeline take a gateway as an explicit
/// constructed dependency, so tests substitute [`MockLedgerGateway`]
/// without touching the network.
///
/// Retry contract: implementations may retry `query_*`/`get_*`/
/// `estimate_cost` transparently on transient failures (reads are
/// idempotent), but must never retry `submit_transaction` on an ambiguous
/// outcome - resubmission could duplicate an append.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Submit a transaction and wait for the ledger to accept or reject it.
    async fn submit_transaction(
        &self,
        tx: &LedgerTransaction,
    ) -> Result<LedgerReceipt, SubmitError>;

    /// Fetch all emitted events of the given on-ledger type, following
    /// pagination to completion (bounded by configuration). Callers never
    /// see partial pages.
    async fn query_events_by_type(
        &self,
        event_type: &str,
    ) -> Result<Vec<RawLedgerEvent>, QueryError>;

    /// Fetch one shared object with its content.
    async fn get_object(&self, object_id: &str) -> Result<LedgerObject, QueryError>;

    /// Fetch the transactions submitted by one address, newest last.
    async fn query_transactions_by_address(
        &self,
        address: &str,
    ) -> Result<Vec<TransactionSummary>, QueryError>;

    /// Dry-run a transaction and report its resource cost without committing.
    async fn estimate_cost(&self, tx: &LedgerTransaction) -> Result<CostEstimate, QueryError>;
}

// ============================================================================
// Mock Gateway for Testing
// ============================================================================

/// Registry content key holding the product table.
pub const REGISTRY_PRODUCTS_KEY: &str = "products";

struct MockLedgerState {
    products: BTreeMap<String, ProductRecord>,
    events: Vec<RawLedgerEvent>,
    transactions: Vec<(String, TransactionSummary)>,
    registry_version: u64,
}

/// In-memory ledger gateway for tests
///
/// Behaves like a single-node ledger: transactions apply atomically under
/// one lock, acceptance timestamps are monotonic regardless of what the
/// submitter's event claims, and the registry object exposes the product
/// table the way the real registry module does.
pub struct MockLedgerGateway {
    config: LedgerConfig,
    state: Mutex<MockLedgerState>,
    next_timestamp_ms: AtomicU64,
    /// All operations fail with NetworkUnavailable; nothing commits
    fail_mode: AtomicBool,
    /// Submissions commit, then report Timeout - the ambiguous outcome
    /// the append protocol must surface as Undetermined
    ambiguous_submits: AtomicBool,
}

impl MockLedgerGateway {
    /// Create a mock gateway answering for the default registry/package ids.
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    /// Create a mock gateway answering for the given configuration.
    pub fn with_config(config: LedgerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(MockLedgerState {
                products: BTreeMap::new(),
                events: Vec::new(),
                transactions: Vec::new(),
                registry_version: 1,
            }),
            next_timestamp_ms: AtomicU64::new(1_700_000_000_000),
            fail_mode: AtomicBool::new(false),
            ambiguous_submits: AtomicBool::new(false),
        }
    }

    /// Make every operation fail with `NetworkUnavailable` without
    /// committing anything.
    pub fn set_fail_mode(&self, fail: bool) {
        self.fail_mode.store(fail, Ordering::SeqCst);
    }

    /// Make submissions commit but report `Timeout`, simulating a network
    /// fault after the ledger accepted the transaction.
    pub fn set_ambiguous_submits(&self, ambiguous: bool) {
        self.ambiguous_submits.store(ambiguous, Ordering::SeqCst);
    }

    /// Inject a raw event directly into the ledger stream, bypassing the
    /// submit path. Used to stage malformed payloads and foreign events.
    pub fn inject_raw_event(&self, event: RawLedgerEvent) {
        self.state.lock().unwrap().events.push(event);
    }

    /// Next acceptance timestamp. Strictly monotonic so ledger order never
    /// depends on submitter-reported clocks.
    fn tick(&self) -> u64 {
        self.next_timestamp_ms.fetch_add(1, Ordering::SeqCst)
    }

    fn digest_of(payload: &str, timestamp_ms: u64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(payload.as_bytes());
        hasher.update(timestamp_ms.to_be_bytes());
        hex::encode(hasher.finalize())
    }

    fn emit_event(
        state: &mut MockLedgerState,
        event_type: String,
        tx_digest: &str,
        timestamp_ms: u64,
        event: &JourneyEvent,
    ) -> Result<(), SubmitError> {
        let parsed = serde_json::to_value(event)
            .map_err(|e| SubmitError::Rejected(format!("unserializable event: {e}")))?;
        state.events.push(RawLedgerEvent {
            id: EventId {
                tx_digest: tx_digest.to_string(),
                event_seq: 0,
            },
            event_type,
            timestamp_ms,
            parsed,
        });
        Ok(())
    }
}

impl Default for MockLedgerGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerGateway for MockLedgerGateway {
    async fn submit_transaction(
        &self,
        tx: &LedgerTransaction,
    ) -> Result<LedgerReceipt, SubmitError> {
        if self.fail_mode.load(Ordering::SeqCst) {
            return Err(SubmitError::NetworkUnavailable(
                "mock ledger unreachable".to_string(),
            ));
        }

        let payload = tx.encode()?;
        let timestamp_ms = self.tick();
        let tx_digest = Self::digest_of(&payload, timestamp_ms);
        let event_type = self.config.journey_event_type();
        let submitter = match tx {
            LedgerTransaction::RegisterProduct { first_event, .. } => {
                first_event.submitted_by.clone()
            }
            LedgerTransaction::RecordJourneyEvent { event } => event.submitted_by.clone(),
        };

        {
            let mut state = self.state.lock().unwrap();
            match tx {
                LedgerTransaction::RegisterProduct {
                    record,
                    first_event,
                } => {
                    if state.products.contains_key(record.id.as_str()) {
                        return Err(SubmitError::Rejected(format!(
                            "product {} already registered",
                            record.id
                        )));
                    }
                    if first_event.product_id != record.id {
                        return Err(SubmitError::Rejected(
                            "first event does not reference the registered product".to_string(),
                        ));
                    }
                    // Both writes under one lock hold: the mock's atomicity
                    // guarantee matches the ledger transaction's.
                    state
                        .products
                        .insert(record.id.as_str().to_string(), record.clone());
                    Self::emit_event(&mut state, event_type, &tx_digest, timestamp_ms, first_event)?;
                    state.registry_version += 1;
                }
                LedgerTransaction::RecordJourneyEvent { event } => {
                    Self::emit_event(&mut state, event_type, &tx_digest, timestamp_ms, event)?;
                }
            }
            state.transactions.push((
                submitter,
                TransactionSummary {
                    tx_digest: tx_digest.clone(),
                    timestamp_ms,
                },
            ));
        }

        if self.ambiguous_submits.load(Ordering::SeqCst) {
            return Err(SubmitError::Timeout(
                "no response from mock ledger within the deadline".to_string(),
            ));
        }

        Ok(LedgerReceipt {
            tx_digest,
            timestamp_ms,
        })
    }

    async fn query_events_by_type(
        &self,
        event_type: &str,
    ) -> Result<Vec<RawLedgerEvent>, QueryError> {
        if self.fail_mode.load(Ordering::SeqCst) {
            return Err(QueryError::NetworkUnavailable(
                "mock ledger unreachable".to_string(),
            ));
        }

        let state = self.state.lock().unwrap();
        Ok(state
            .events
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect())
    }

    async fn get_object(&self, object_id: &str) -> Result<LedgerObject, QueryError> {
        if self.fail_mode.load(Ordering::SeqCst) {
            return Err(QueryError::NetworkUnavailable(
                "mock ledger unreachable".to_string(),
            ));
        }

        if object_id != self.config.registry_object_id {
            return Err(QueryError::MalformedResponse(format!(
                "mock ledger has no object {object_id}"
            )));
        }

        let state = self.state.lock().unwrap();
        let products = serde_json::to_value(&state.products)
            .map_err(|e| QueryError::MalformedResponse(e.to_string()))?;
        let content = serde_json::json!({ REGISTRY_PRODUCTS_KEY: products });
        let bcs = base64::engine::general_purpose::STANDARD.encode(content.to_string());
        Ok(LedgerObject {
            object_id: object_id.to_string(),
            version: state.registry_version,
            content,
            bcs: Some(bcs),
        })
    }

    async fn query_transactions_by_address(
        &self,
        address: &str,
    ) -> Result<Vec<TransactionSummary>, QueryError> {
        if self.fail_mode.load(Ordering::SeqCst) {
            return Err(QueryError::NetworkUnavailable(
                "mock ledger unreachable".to_string(),
            ));
        }

        let state = self.state.lock().unwrap();
        Ok(state
            .transactions
            .iter()
            .filter(|(submitter, _)| submitter == address)
            .map(|(_, summary)| summary.clone())
            .collect())
    }

    async fn estimate_cost(&self, tx: &LedgerTransaction) -> Result<CostEstimate, QueryError> {
        if self.fail_mode.load(Ordering::SeqCst) {
            return Err(QueryError::NetworkUnavailable(
                "mock ledger unreachable".to_string(),
            ));
        }

        let payload = tx
            .encode()
            .map_err(|e| QueryError::MalformedResponse(e.to_string()))?;
        Ok(CostEstimate {
            computation_cost: 1_000_000,
            storage_cost: payload.len() as u64 * 100,
        })
    }
}
