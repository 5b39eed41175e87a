//! Verification Front
//!
//! The consumer-facing entry point: takes whatever a scanner or a text box
//! produced - a full verification reference or a bare identifier - and
//! returns a displayable journey or a typed failure. "Could not reach the
//! ledger" and "no such product" are distinct outcomes so a client can
//! retry the former instead of reporting a false negative.

use std::sync::Arc;

use trackit_core::{ProductId, ProductRecord, Timeline, VerificationReference};

use crate::config::LedgerConfig;
use crate::error::{VerifyError, VerifyResult};
use crate::gateway::LedgerGateway;
use crate::assembly::JourneyAssembler;

/// Displayable verification result
#[derive(Debug, Clone)]
pub struct VerificationView {
    pub record: ProductRecord,
    pub timeline: Timeline,
    /// Events that were attributed to the product but failed to parse
    pub skipped_events: usize,
}

/// Verification front over the assembly pipeline
pub struct VerificationFront<G: LedgerGateway> {
    assembler: JourneyAssembler<G>,
}

impl<G: LedgerGateway> VerificationFront<G> {
    pub fn new(gateway: Arc<G>, config: LedgerConfig) -> Self {
        Self {
            assembler: JourneyAssembler::new(gateway, config),
        }
    }

    /// Verify a product given a reference or raw identifier.
    pub async fn verify(&self, input: &str) -> VerifyResult<VerificationView> {
        let input = input.trim();
        let id = Self::resolve_input(input)?;
        let journey = self.assembler.assemble(&id).await?;
        Ok(VerificationView {
            record: journey.record,
            timeline: journey.timeline,
            skipped_events: journey.skipped,
        })
    }

    /// Resolve either input shape to an identifier.
    fn resolve_input(input: &str) -> VerifyResult<ProductId> {
        if input.is_empty() {
            return Err(VerifyError::MalformedReference(
                "enter a product identifier or scan its code".to_string(),
            ));
        }
        if VerificationReference::matches_shape(input) {
            return Ok(VerificationReference::resolve(input)?);
        }
        Ok(ProductId::parse(input)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::append::{AppendProtocol, Registration};
    use crate::gateway::MockLedgerGateway;

    async fn registered_front() -> (VerificationFront<MockLedgerGateway>, String) {
        let gateway = Arc::new(MockLedgerGateway::new());
        let protocol = AppendProtocol::new(gateway.clone());
        let registered = protocol
            .register_product(Registration {
                name: "Colombian Coffee Beans".to_string(),
                origin: "Bogotá, Colombia".to_string(),
                manufacture_date: chrono::NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
                description: "Premium arabica".to_string(),
                submitted_by: "farm-coop-01".to_string(),
                base_uri: "https://trackit.example".to_string(),
            })
            .await
            .unwrap();
        (
            VerificationFront::new(gateway, LedgerConfig::default()),
            registered.reference.as_str().to_string(),
        )
    }

    #[tokio::test]
    async fn test_verify_by_reference_and_by_identifier() {
        let (front, reference) = registered_front().await;

        let by_reference = front.verify(&reference).await.unwrap();
        let id = by_reference.record.id.as_str().to_string();
        let by_id = front.verify(&id).await.unwrap();

        assert_eq!(by_reference.record, by_id.record);
        assert_eq!(by_reference.timeline, by_id.timeline);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let (front, _) = registered_front().await;
        let err = front.verify("PROD-404-nonesuch").await.unwrap_err();
        assert!(matches!(err, VerifyError::UnknownProduct(_)));
    }

    #[tokio::test]
    async fn test_unavailable_is_distinguished_from_unknown() {
        let gateway = Arc::new(MockLedgerGateway::new());
        gateway.set_fail_mode(true);
        let front = VerificationFront::new(gateway, LedgerConfig::default());

        let err = front.verify("PROD-404-nonesuch").await.unwrap_err();
        assert!(matches!(err, VerifyError::TemporarilyUnavailable(_)));
    }

    #[tokio::test]
    async fn test_malformed_inputs() {
        let (front, _) = registered_front().await;
        for input in [
            "",
            "   ",
            "not-a-product",
            "PROD-does-not-exist",
            "PROD--",
            "https://x.example/verify/",
        ] {
            let err = front.verify(input).await.unwrap_err();
            assert!(
                matches!(err, VerifyError::MalformedReference(_)),
                "input {input:?} should be malformed"
            );
        }
    }
}
