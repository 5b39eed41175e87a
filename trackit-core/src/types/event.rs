//! Journey events and the derived timeline view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ident::ProductId;

/// Supply chain stage labels
///
/// The recognized labels match the stages participants pick from; anything
/// else is carried verbatim as `Custom` rather than rejected, since new
/// participants introduce new checkpoints faster than this list changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JourneyStage {
    Registered,
    InTransitDistributor,
    InTransitInternational,
    ReceivedRetailer,
    QualityCheck,
    Storage,
    AvailableForPurchase,
    /// Unrecognized stage label, carried as-is
    Custom(String),
}

impl JourneyStage {
    /// The display label, as shown to verifiers and stored on the ledger.
    pub fn label(&self) -> &str {
        match self {
            Self::Registered => "Registered",
            Self::InTransitDistributor => "In Transit - Distributor",
            Self::InTransitInternational => "In Transit - International",
            Self::ReceivedRetailer => "Received - Retailer",
            Self::QualityCheck => "Quality Check",
            Self::Storage => "Storage",
            Self::AvailableForPurchase => "Available for Purchase",
            Self::Custom(label) => label,
        }
    }

    /// Parse a label back into a stage. Unknown labels become `Custom`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Registered" => Self::Registered,
            "In Transit - Distributor" => Self::InTransitDistributor,
            "In Transit - International" => Self::InTransitInternational,
            "Received - Retailer" => Self::ReceivedRetailer,
            "Quality Check" => Self::QualityCheck,
            "Storage" => Self::Storage,
            "Available for Purchase" => Self::AvailableForPurchase,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Whether this is one of the recognized labels (not `Custom`).
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for JourneyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl Serialize for JourneyStage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for JourneyStage {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::from_label(&label))
    }
}

/// Reported product condition at a checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductCondition {
    Good,
    Fair,
    NeedsAttention,
    Critical,
    /// Free-text condition, e.g. "Newly registered"
    Other(String),
}

impl ProductCondition {
    pub fn label(&self) -> &str {
        match self {
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::NeedsAttention => "Needs Attention",
            Self::Critical => "Critical",
            Self::Other(label) => label,
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label {
            "Good" => Self::Good,
            "Fair" => Self::Fair,
            "Needs Attention" => Self::NeedsAttention,
            "Critical" => Self::Critical,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ProductCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl Serialize for ProductCondition {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for ProductCondition {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::from_label(&label))
    }
}

/// One immutable supply chain checkpoint for a product
///
/// `reported_at` is the submitter's clock and is untrusted: it is carried
/// for display but never used to order a timeline. Ordering comes from the
/// ledger's acceptance timestamp on the emitted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyEvent {
    /// Product this event belongs to
    pub product_id: ProductId,
    /// Supply chain stage label
    pub stage: JourneyStage,
    /// Where the checkpoint happened
    pub location: String,
    /// Condition of the product at this checkpoint
    pub condition: ProductCondition,
    /// Optional free-text notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Submitter-reported timestamp (informational only, untrusted)
    pub reported_at: DateTime<Utc>,
    /// Identity of the submitting participant
    pub submitted_by: String,
}

/// One entry of an assembled timeline: a journey event plus the ledger
/// metadata that anchors it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// The event as recorded on the ledger
    pub event: JourneyEvent,
    /// Ledger-assigned acceptance timestamp (milliseconds) - the ordering key
    pub ledger_timestamp_ms: u64,
    /// Transaction digest of the accepting transaction
    pub tx_digest: String,
    /// Event sequence number within the transaction
    pub event_seq: u64,
    /// Set once the event has been observed in ledger query results
    pub verified: bool,
}

/// Totally ordered journey view for one product
///
/// Derived, never persisted: rebuilt from ledger state on every
/// verification request.
pub type Timeline = Vec<TimelineEntry>;
