//! Journey Assembly Pipeline
//!
//! Rebuilds a product's verified timeline from raw ledger state on every
//! request: fetch the registration record, pull the full journey event
//! stream, isolate this product's events, deduplicate, order by ledger
//! acceptance, and mark each survivor verified. Nothing is cached across
//! calls - the result is always consistent with ledger state at query time.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use trackit_core::{JourneyEvent, ProductId, ProductRecord, Timeline, TimelineEntry};

use crate::config::LedgerConfig;
use crate::error::{AssemblyError, AssemblyResult};
use crate::gateway::{LedgerGateway, RawLedgerEvent, REGISTRY_PRODUCTS_KEY};

/// The assembled, verified journey for one product
#[derive(Debug, Clone)]
pub struct AssembledJourney {
    /// Immutable registration record
    pub record: ProductRecord,
    /// Events in ledger acceptance order, all marked verified
    pub timeline: Timeline,
    /// Events attributed to this product that failed to parse and were
    /// skipped. Non-zero means the display layer should say so; it never
    /// hides the events that did parse.
    pub skipped: usize,
}

/// Journey assembler over a ledger gateway
pub struct JourneyAssembler<G: LedgerGateway> {
    gateway: Arc<G>,
    config: LedgerConfig,
}

impl<G: LedgerGateway> JourneyAssembler<G> {
    pub fn new(gateway: Arc<G>, config: LedgerConfig) -> Self {
        Self { gateway, config }
    }

    /// Assemble the verified journey for one identifier.
    ///
    /// A registered product with no further updates yields an empty
    /// timeline, which is success, not an error.
    pub async fn assemble(&self, id: &ProductId) -> AssemblyResult<AssembledJourney> {
        let record = self.fetch_record(id).await?;

        let raw = self
            .gateway
            .query_events_by_type(&self.config.journey_event_type())
            .await?;

        let (timeline, skipped) = build_timeline(id, raw);
        info!(
            product_id = %id,
            entries = timeline.len(),
            skipped,
            "journey assembled"
        );

        Ok(AssembledJourney {
            record,
            timeline,
            skipped,
        })
    }

    /// Fetch the product record from the registry object's product table.
    async fn fetch_record(&self, id: &ProductId) -> AssemblyResult<ProductRecord> {
        let registry = self
            .gateway
            .get_object(&self.config.registry_object_id)
            .await?;

        let products = registry
            .content
            .get(REGISTRY_PRODUCTS_KEY)
            .ok_or_else(|| {
                AssemblyError::Unavailable(
                    "registry object carries no product table".to_string(),
                )
            })?;

        let entry = products
            .get(id.as_str())
            .ok_or_else(|| AssemblyError::NotFound(id.to_string()))?;

        serde_json::from_value(entry.clone()).map_err(|e| {
            AssemblyError::Unavailable(format!("registry entry for {id} does not parse: {e}"))
        })
    }
}

/// Filter, deduplicate, and order the raw event stream for one product.
///
/// The stream is multi-tenant and unordered; this is where the timeline's
/// guarantees are constructed. Ordering is strictly the ledger's
/// acceptance order `(timestamp_ms, tx_digest, event_seq)` - the
/// submitter-reported timestamp inside the payload is untrusted and
/// ignored here. Returns the timeline plus the count of skipped
/// (unparseable) events attributed to this product.
fn build_timeline(id: &ProductId, raw: Vec<RawLedgerEvent>) -> (Timeline, usize) {
    let mut seen = HashSet::new();
    let mut entries: Timeline = Vec::new();
    let mut skipped = 0;

    for event in raw {
        // Isolation: the embedded identifier is the only thing that ties
        // an event to a product.
        match event.parsed.get("product_id").and_then(|v| v.as_str()) {
            Some(pid) if pid == id.as_str() => {}
            Some(_) => continue,
            None => {
                // Not attributable to any product, so it never counts
                // against this product's skipped tally.
                warn!(
                    tx_digest = %event.id.tx_digest,
                    event_seq = event.id.event_seq,
                    "skipping event with no readable product_id"
                );
                continue;
            }
        }

        // Dedup by ledger-assigned identity: a re-query or overlapping
        // pages must never double-count.
        if !seen.insert(event.id.clone()) {
            continue;
        }

        match serde_json::from_value::<JourneyEvent>(event.parsed.clone()) {
            Ok(journey_event) => entries.push(TimelineEntry {
                event: journey_event,
                ledger_timestamp_ms: event.timestamp_ms,
                tx_digest: event.id.tx_digest,
                event_seq: event.id.event_seq,
                // Presence in ledger query results is the verification.
                verified: true,
            }),
            Err(e) => {
                skipped += 1;
                warn!(
                    product_id = %id,
                    tx_digest = %event.id.tx_digest,
                    error = %e,
                    "skipping malformed journey event"
                );
            }
        }
    }

    entries.sort_by(|a, b| {
        (a.ledger_timestamp_ms, &a.tx_digest, a.event_seq)
            .cmp(&(b.ledger_timestamp_ms, &b.tx_digest, b.event_seq))
    });

    (entries, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::append::{AppendProtocol, AppendRequest, Registration};
    use crate::gateway::{EventId, MockLedgerGateway};
    use serde_json::json;
    use trackit_core::{JourneyStage, ProductCondition};

    fn raw_event(
        id: &ProductId,
        stage: &str,
        timestamp_ms: u64,
        tx_digest: &str,
        reported_at: &str,
    ) -> RawLedgerEvent {
        RawLedgerEvent {
            id: EventId {
                tx_digest: tx_digest.to_string(),
                event_seq: 0,
            },
            event_type: "test::product_registry::ProductJourneyUpdated".to_string(),
            timestamp_ms,
            parsed: json!({
                "product_id": id.as_str(),
                "stage": stage,
                "location": "somewhere",
                "condition": "Good",
                "reported_at": reported_at,
                "submitted_by": "tester",
            }),
        }
    }

    #[test]
    fn test_ordering_ignores_reported_timestamps() {
        let id = ProductId::generate();
        // Reported timestamps deliberately shuffled against acceptance order.
        let raw = vec![
            raw_event(&id, "Received - Retailer", 3000, "tx-c", "2026-01-01T00:00:00Z"),
            raw_event(&id, "Registered", 1000, "tx-a", "2026-03-01T00:00:00Z"),
            raw_event(&id, "Quality Check", 2000, "tx-b", "2026-02-01T00:00:00Z"),
        ];

        let (timeline, skipped) = build_timeline(&id, raw);
        assert_eq!(skipped, 0);
        let stages: Vec<_> = timeline.iter().map(|e| e.event.stage.clone()).collect();
        assert_eq!(
            stages,
            vec![
                JourneyStage::Registered,
                JourneyStage::QualityCheck,
                JourneyStage::ReceivedRetailer,
            ]
        );
    }

    #[test]
    fn test_dedup_by_event_identity() {
        let id = ProductId::generate();
        let event = raw_event(&id, "Storage", 1000, "tx-a", "2026-01-01T00:00:00Z");
        let (timeline, _) = build_timeline(&id, vec![event.clone(), event.clone(), event]);
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn test_isolation_between_products() {
        let a = ProductId::generate();
        let b = ProductId::generate();
        let raw = vec![
            raw_event(&a, "Registered", 1000, "tx-1", "2026-01-01T00:00:00Z"),
            raw_event(&b, "Registered", 1100, "tx-2", "2026-01-01T00:00:00Z"),
            raw_event(&b, "Storage", 1200, "tx-3", "2026-01-01T00:00:00Z"),
        ];

        let (timeline_a, _) = build_timeline(&a, raw.clone());
        let (timeline_b, _) = build_timeline(&b, raw);
        assert_eq!(timeline_a.len(), 1);
        assert_eq!(timeline_b.len(), 2);
        assert!(timeline_a
            .iter()
            .all(|e| e.event.product_id == a));
    }

    #[test]
    fn test_malformed_event_skipped_not_fatal() {
        let id = ProductId::generate();
        let mut raw: Vec<_> = (0..4)
            .map(|i| {
                raw_event(
                    &id,
                    "Storage",
                    1000 + i,
                    &format!("tx-{i}"),
                    "2026-01-01T00:00:00Z",
                )
            })
            .collect();
        // Attributed to this product, but the payload is missing fields.
        raw.push(RawLedgerEvent {
            id: EventId {
                tx_digest: "tx-bad".to_string(),
                event_seq: 0,
            },
            event_type: "test::product_registry::ProductJourneyUpdated".to_string(),
            timestamp_ms: 1002,
            parsed: json!({ "product_id": id.as_str(), "stage": "Storage" }),
        });

        let (timeline, skipped) = build_timeline(&id, raw);
        assert_eq!(timeline.len(), 4);
        assert_eq!(skipped, 1);
        assert!(timeline.iter().all(|e| e.verified));
    }

    #[test]
    fn test_unattributable_event_not_counted_as_skipped() {
        let id = ProductId::generate();
        let mut raw = vec![raw_event(&id, "Storage", 1000, "tx-a", "2026-01-01T00:00:00Z")];
        // No product_id at all: it belongs to nobody's timeline, so it
        // must not inflate this product's skipped count either.
        raw.push(RawLedgerEvent {
            id: EventId {
                tx_digest: "tx-anon".to_string(),
                event_seq: 0,
            },
            event_type: "test::product_registry::ProductJourneyUpdated".to_string(),
            timestamp_ms: 1001,
            parsed: json!({ "stage": "Storage", "location": "nowhere" }),
        });

        let (timeline, skipped) = build_timeline(&id, raw);
        assert_eq!(timeline.len(), 1);
        assert_eq!(skipped, 0);
    }

    #[tokio::test]
    async fn test_not_found_vs_unavailable() {
        let gateway = Arc::new(MockLedgerGateway::new());
        let assembler = JourneyAssembler::new(gateway.clone(), LedgerConfig::default());

        let unknown = ProductId::parse("PROD-1-doesnotexist").unwrap();
        assert!(matches!(
            assembler.assemble(&unknown).await.unwrap_err(),
            AssemblyError::NotFound(_)
        ));

        gateway.set_fail_mode(true);
        assert!(matches!(
            assembler.assemble(&unknown).await.unwrap_err(),
            AssemblyError::Unavailable(_)
        ));
    }

    #[tokio::test]
    async fn test_registered_only_product_has_empty_update_tail() {
        let gateway = Arc::new(MockLedgerGateway::new());
        let protocol = AppendProtocol::new(gateway.clone());
        let registered = protocol
            .register_product(Registration {
                name: "Single Origin Cacao".to_string(),
                origin: "Guayaquil, Ecuador".to_string(),
                manufacture_date: chrono::NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
                description: String::new(),
                submitted_by: "farm-02".to_string(),
                base_uri: "https://trackit.example".to_string(),
            })
            .await
            .unwrap();

        let assembler = JourneyAssembler::new(gateway, LedgerConfig::default());
        let journey = assembler.assemble(&registered.record.id).await.unwrap();
        // Registration itself contributes the first event; no further
        // updates is a valid, non-error state.
        assert_eq!(journey.timeline.len(), 1);
        assert_eq!(journey.timeline[0].event.stage, JourneyStage::Registered);
        assert_eq!(journey.skipped, 0);
    }

    #[tokio::test]
    async fn test_assemble_idempotent_without_writes() {
        let gateway = Arc::new(MockLedgerGateway::new());
        let protocol = AppendProtocol::new(gateway.clone());
        let registered = protocol
            .register_product(Registration {
                name: "Test".to_string(),
                origin: "Lima, Peru".to_string(),
                manufacture_date: chrono::NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                description: String::new(),
                submitted_by: "farm-03".to_string(),
                base_uri: "https://trackit.example".to_string(),
            })
            .await
            .unwrap();
        protocol
            .append_event(AppendRequest {
                product_id: registered.record.id.as_str().to_string(),
                stage: JourneyStage::Storage,
                location: "Callao".to_string(),
                condition: ProductCondition::Fair,
                notes: Some("held in bonded warehouse".to_string()),
                submitted_by: "warehouse-11".to_string(),
            })
            .await
            .unwrap();

        let assembler = JourneyAssembler::new(gateway, LedgerConfig::default());
        let first = assembler.assemble(&registered.record.id).await.unwrap();
        let second = assembler.assemble(&registered.record.id).await.unwrap();
        assert_eq!(first.timeline, second.timeline);
        assert_eq!(first.record, second.record);
    }
}
