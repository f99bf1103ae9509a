use chrono::{DateTime, Utc};

/// Metadata every published fact carries.
///
/// The notification worker tags its span with these so a delayed or dropped
/// message can be traced back to the checkout that raised it.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name, e.g. `fulfillment.order.created`.
    fn event_type(&self) -> &'static str;

    /// Bumped when the payload shape changes.
    fn version(&self) -> u32;

    /// When the underlying write committed.
    fn occurred_at(&self) -> DateTime<Utc>;
}
