//! Domain entities: product records, journey events, timelines.

mod event;
mod product;

pub use event::{JourneyEvent, JourneyStage, ProductCondition, Timeline, TimelineEntry};
pub use product::ProductRecord;
