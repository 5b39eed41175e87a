//! Protocol constants shared across the workspace.

/// Namespace prefix for every product identifier.
pub const ID_PREFIX: &str = "PROD";

/// Length of the random suffix in a generated identifier.
///
/// 10 base36 characters carry ~51.7 bits of entropy, enough that
/// uncoordinated concurrent registrants will not collide in practice.
pub const ID_RANDOM_LEN: usize = 10;

/// Base36 alphabet used for the random identifier component.
pub const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Path segment that marks a verification reference.
pub const VERIFY_PATH: &str = "/verify/";

/// On-ledger module that owns the product registry.
pub const REGISTRY_MODULE: &str = "product_registry";

/// Name of the journey event struct emitted by the registry module.
/// The fully qualified on-ledger type is `<package>::product_registry::ProductJourneyUpdated`.
pub const JOURNEY_EVENT_STRUCT: &str = "ProductJourneyUpdated";

/// Condition recorded on the automatic first event at registration.
pub const REGISTRATION_CONDITION: &str = "Newly registered";
