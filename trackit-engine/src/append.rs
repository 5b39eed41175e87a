//! Event Append Protocol
//!
//! Validates caller-supplied fields, builds a well-formed journey event,
//! and submits it through the ledger gateway. Registration is the special
//! case that creates the product record and its first "Registered" event
//! in a single atomic transaction.

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::info;

use trackit_core::constants::REGISTRATION_CONDITION;
use trackit_core::{
    JourneyEvent, JourneyStage, ProductCondition, ProductId, ProductRecord, VerificationReference,
};

use crate::error::{AppendError, AppendResult};
use crate::gateway::{LedgerGateway, LedgerTransaction};

/// Caller-supplied fields for one journey event
#[derive(Debug, Clone)]
pub struct AppendRequest {
    /// Raw identifier string as entered or scanned
    pub product_id: String,
    pub stage: JourneyStage,
    pub location: String,
    pub condition: ProductCondition,
    pub notes: Option<String>,
    /// Identity of the submitting participant
    pub submitted_by: String,
}

/// A durably accepted journey event
#[derive(Debug, Clone)]
pub struct AcceptedEvent {
    pub product_id: ProductId,
    /// Digest of the accepting transaction
    pub tx_digest: String,
    /// Ledger acceptance timestamp in milliseconds
    pub ledger_timestamp_ms: u64,
}

/// Caller-supplied fields for a product registration
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub origin: String,
    pub manufacture_date: NaiveDate,
    pub description: String,
    pub submitted_by: String,
    /// Base URI the verification reference is derived against
    pub base_uri: String,
}

/// A durably registered product
#[derive(Debug, Clone)]
pub struct RegisteredProduct {
    pub record: ProductRecord,
    pub reference: VerificationReference,
    pub tx_digest: String,
    pub ledger_timestamp_ms: u64,
}

/// Append protocol over a ledger gateway
///
/// The gateway is an explicit constructed dependency, never a global:
/// tests run the protocol against [`crate::gateway::MockLedgerGateway`].
pub struct AppendProtocol<G: LedgerGateway> {
    gateway: Arc<G>,
}

impl<G: LedgerGateway> AppendProtocol<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    /// Append one journey event to an existing product.
    ///
    /// The identifier is validated for shape only: whether the product
    /// exists is enforced by the ledger, not locally. `Undetermined`
    /// outcomes mean the caller must re-assemble the journey and check
    /// before deciding to resubmit.
    pub async fn append_event(&self, request: AppendRequest) -> AppendResult<AcceptedEvent> {
        let event = self.validate(request)?;
        let product_id = event.product_id.clone();

        let receipt = self
            .gateway
            .submit_transaction(&LedgerTransaction::RecordJourneyEvent { event })
            .await?;

        info!(
            product_id = %product_id,
            tx_digest = %receipt.tx_digest,
            "journey event accepted"
        );

        Ok(AcceptedEvent {
            product_id,
            tx_digest: receipt.tx_digest,
            ledger_timestamp_ms: receipt.timestamp_ms,
        })
    }

    /// Register a new product.
    ///
    /// Generates the identifier, then submits the product record together
    /// with its first "Registered" event as one transaction. The ledger
    /// applies both or neither; a record without its first event (or the
    /// reverse) is never observable.
    pub async fn register_product(
        &self,
        registration: Registration,
    ) -> AppendResult<RegisteredProduct> {
        if registration.name.trim().is_empty() {
            return Err(AppendError::Validation("product name is required".into()));
        }
        if registration.origin.trim().is_empty() {
            return Err(AppendError::Validation("origin location is required".into()));
        }

        let id = ProductId::generate();
        let registered_at = Utc::now();

        let record = ProductRecord {
            id: id.clone(),
            name: registration.name,
            origin: registration.origin.clone(),
            manufacture_date: registration.manufacture_date,
            description: registration.description,
            registered_at,
        };
        let first_event = JourneyEvent {
            product_id: id.clone(),
            stage: JourneyStage::Registered,
            location: registration.origin,
            condition: ProductCondition::Other(REGISTRATION_CONDITION.to_string()),
            notes: None,
            reported_at: registered_at,
            submitted_by: registration.submitted_by,
        };

        let receipt = self
            .gateway
            .submit_transaction(&LedgerTransaction::RegisterProduct {
                record: record.clone(),
                first_event,
            })
            .await?;

        let reference = VerificationReference::derive(&id, &registration.base_uri);
        info!(
            product_id = %id,
            tx_digest = %receipt.tx_digest,
            "product registered"
        );

        Ok(RegisteredProduct {
            record,
            reference,
            tx_digest: receipt.tx_digest,
            ledger_timestamp_ms: receipt.timestamp_ms,
        })
    }

    fn validate(&self, request: AppendRequest) -> AppendResult<JourneyEvent> {
        if request.product_id.trim().is_empty() {
            return Err(AppendError::Validation("product identifier is required".into()));
        }
        let product_id = ProductId::parse(request.product_id.trim())
            .map_err(|e| AppendError::Validation(e.to_string()))?;

        if request.location.trim().is_empty() {
            return Err(AppendError::Validation("location is required".into()));
        }
        if request.submitted_by.trim().is_empty() {
            return Err(AppendError::Validation("submitter identity is required".into()));
        }

        // Stage needs no gating: unrecognized labels arrive as an explicit
        // Custom variant rather than being rejected.
        Ok(JourneyEvent {
            product_id,
            stage: request.stage,
            location: request.location.trim().to_string(),
            condition: request.condition,
            notes: request.notes.filter(|n| !n.trim().is_empty()),
            // Submitter clock: informational only, never an ordering key.
            reported_at: Utc::now(),
            submitted_by: request.submitted_by.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockLedgerGateway;

    fn protocol() -> AppendProtocol<MockLedgerGateway> {
        AppendProtocol::new(Arc::new(MockLedgerGateway::new()))
    }

    fn registration() -> Registration {
        Registration {
            name: "Colombian Coffee Beans".to_string(),
            origin: "Bogotá, Colombia".to_string(),
            manufacture_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            description: "Premium arabica".to_string(),
            submitted_by: "farm-coop-01".to_string(),
            base_uri: "https://trackit.example".to_string(),
        }
    }

    fn append_request(product_id: &str) -> AppendRequest {
        AppendRequest {
            product_id: product_id.to_string(),
            stage: JourneyStage::InTransitDistributor,
            location: "Port of Buenaventura".to_string(),
            condition: ProductCondition::Good,
            notes: None,
            submitted_by: "distributor-07".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_returns_reference() {
        let registered = protocol().register_product(registration()).await.unwrap();
        let resolved =
            VerificationReference::resolve(registered.reference.as_str()).unwrap();
        assert_eq!(resolved, registered.record.id);
        assert!(!registered.tx_digest.is_empty());
    }

    #[tokio::test]
    async fn test_register_rejects_empty_origin() {
        let mut reg = registration();
        reg.origin = "  ".to_string();
        let err = protocol().register_product(reg).await.unwrap_err();
        assert!(matches!(err, AppendError::Validation(_)));
    }

    #[tokio::test]
    async fn test_append_validates_fields() {
        let protocol = protocol();

        let empty_id = append_request("");
        assert!(matches!(
            protocol.append_event(empty_id).await.unwrap_err(),
            AppendError::Validation(_)
        ));

        let bad_shape = append_request("not-a-product-id");
        assert!(matches!(
            protocol.append_event(bad_shape).await.unwrap_err(),
            AppendError::Validation(_)
        ));

        let mut no_location = append_request("PROD-1-abc");
        no_location.location = "  ".to_string();
        assert!(matches!(
            protocol.append_event(no_location).await.unwrap_err(),
            AppendError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_append_accepts_unknown_identifier() {
        // Existence is the ledger's call; the protocol only checks shape.
        let accepted = protocol()
            .append_event(append_request("PROD-999-neverseen"))
            .await
            .unwrap();
        assert_eq!(accepted.product_id.as_str(), "PROD-999-neverseen");
    }

    #[tokio::test]
    async fn test_append_custom_stage_allowed() {
        let mut request = append_request("PROD-1-abc");
        request.stage = JourneyStage::Custom("Cold Chain Inspection".to_string());
        assert!(protocol().append_event(request).await.is_ok());
    }

    #[tokio::test]
    async fn test_network_fault_surfaces_undetermined() {
        let gateway = Arc::new(MockLedgerGateway::new());
        gateway.set_fail_mode(true);
        let protocol = AppendProtocol::new(gateway);

        let err = protocol
            .append_event(append_request("PROD-1-abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppendError::Undetermined(_)));
    }

    #[tokio::test]
    async fn test_ambiguous_submit_is_undetermined_not_retried() {
        let gateway = Arc::new(MockLedgerGateway::new());
        gateway.set_ambiguous_submits(true);
        let protocol = AppendProtocol::new(gateway.clone());

        let err = protocol
            .append_event(append_request("PROD-1-abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppendError::Undetermined(_)));

        // The protocol must not have resubmitted: exactly one event landed.
        gateway.set_ambiguous_submits(false);
        let events = gateway
            .query_events_by_type(&crate::config::LedgerConfig::default().journey_event_type())
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_registration_leaves_nothing_behind() {
        let gateway = Arc::new(MockLedgerGateway::new());
        gateway.set_fail_mode(true);
        let protocol = AppendProtocol::new(gateway.clone());

        assert!(protocol.register_product(registration()).await.is_err());

        gateway.set_fail_mode(false);
        let config = crate::config::LedgerConfig::default();
        let registry = gateway.get_object(&config.registry_object_id).await.unwrap();
        let products = registry.content.get("products").unwrap();
        assert_eq!(products.as_object().unwrap().len(), 0);
        let events = gateway
            .query_events_by_type(&config.journey_event_type())
            .await
            .unwrap();
        assert!(events.is_empty());
    }
}
