use crate::error::EventResult;
use crate::types::Event;

/// Append-only destination for operational events.
///
/// Controllers only ever write; reading back is the store's business.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &Event) -> EventResult<()>;
}
