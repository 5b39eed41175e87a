//! Product record - the immutable registration entry for one product.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ident::ProductId;

/// Registration record for a single physical product
///
/// Created exactly once, atomically with the first journey event, and never
/// mutated afterwards. Everything that happens to the product later is
/// modeled as journey events keyed by `id`, not as updates to this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Product identifier - the join key for all journey events
    pub id: ProductId,
    /// Product name
    pub name: String,
    /// Origin location (also the location of the first journey event)
    pub origin: String,
    /// Manufacturing date as reported by the registrant
    pub manufacture_date: NaiveDate,
    /// Free-text description
    pub description: String,
    /// When the registration transaction was built
    pub registered_at: DateTime<Utc>,
}
