//! Common view over guide events and usage rows

use types::{GuideEvent, UsageEvent};

/// A stored row that can be grouped by visitor, place, device and day
pub trait EventRow {
    fn visitor_id(&self) -> &str;
    fn country(&self) -> Option<&str>;
    fn user_agent(&self) -> Option<&str>;
    /// Number of events the row stands for
    fn event_count(&self) -> u64;
    /// Epoch milliseconds used for daily bucketing
    fn timestamp_ms(&self) -> i64;
}

impl EventRow for GuideEvent {
    fn visitor_id(&self) -> &str {
        &self.visitor_id
    }

    fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    fn event_count(&self) -> u64 {
        1
    }

    fn timestamp_ms(&self) -> i64 {
        self.browser_time
    }
}

impl EventRow for UsageEvent {
    fn visitor_id(&self) -> &str {
        &self.visitor_id
    }

    fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    fn event_count(&self) -> u64 {
        self.num_events
    }

    fn timestamp_ms(&self) -> i64 {
        self.day
    }
}
