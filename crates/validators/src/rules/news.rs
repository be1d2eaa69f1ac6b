//! Scheduled-event window block.

use crate::validator::{Validator, Verdict};
use chrono::{DateTime, Duration, Utc};
use confluence_core::{Candidate, Frame, RegimeSnapshot};
use std::sync::Arc;

/// Source of major scheduled events for a symbol. Capability slot:
/// the engine ships no calendar of its own.
pub trait EventCalendar: Send + Sync {
    /// Major events affecting `symbol` inside `[from, to]`.
    fn major_events_between(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<DateTime<Utc>>;
}

/// Hard-vetoes every candidate while a major scheduled event sits
/// inside the configured window around the frame's last bar. With no
/// calendar configured, passes.
pub struct NewsValidator {
    calendar: Option<Arc<dyn EventCalendar>>,
    window: Duration,
}

impl NewsValidator {
    #[must_use]
    pub fn new(window_minutes: i64) -> Self {
        Self {
            calendar: None,
            window: Duration::minutes(window_minutes),
        }
    }

    #[must_use]
    pub fn with_calendar(mut self, calendar: Arc<dyn EventCalendar>) -> Self {
        self.calendar = Some(calendar);
        self
    }
}

impl Validator for NewsValidator {
    fn name(&self) -> &'static str {
        "news"
    }

    fn audit(&self, candidate: &Candidate, frame: &Frame, _regime: &RegimeSnapshot) -> Verdict {
        let Some(calendar) = &self.calendar else {
            return Verdict::Pass;
        };
        let Some(anchor) = frame.last_timestamp() else {
            return Verdict::Pass;
        };
        let events =
            calendar.major_events_between(&frame.symbol, anchor - self.window, anchor + self.window);
        match events.first() {
            Some(event) => Verdict::Veto(format!(
                "{}: major event at {event} within {} min window",
                candidate.strategy_name,
                self.window.num_minutes()
            )),
            None => Verdict::Pass,
        }
    }
}
