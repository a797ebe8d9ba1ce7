use crate::domain::outcome::{MatchEvent, MatchOutcome, OutcomeKind};
use crate::domain::ports::EventSink;
use std::sync::Mutex;

/// Reports every match outcome as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &MatchEvent) {
        let outcome = event.outcome.kind().as_str();
        match &event.outcome {
            MatchOutcome::Matched {
                stay_id,
                payment_id,
            } => tracing::info!(
                transfer_id = event.transfer_id,
                stay_id,
                payment_id,
                outcome,
                "transfer settled payment"
            ),
            MatchOutcome::PartiallyMatched {
                stay_id,
                payment_id,
                outstanding,
                overdue_days,
            } => tracing::info!(
                transfer_id = event.transfer_id,
                stay_id,
                payment_id,
                %outstanding,
                overdue_days,
                outcome,
                "transfer partially covered payment"
            ),
            MatchOutcome::Unparseable => tracing::warn!(
                transfer_id = event.transfer_id,
                outcome,
                "no stay reference in transfer title"
            ),
            MatchOutcome::StayNotFound { stay_id }
            | MatchOutcome::AccountMismatch { stay_id }
            | MatchOutcome::PaymentNotFound { stay_id } => tracing::warn!(
                transfer_id = event.transfer_id,
                stay_id,
                outcome,
                "transfer left unmatched"
            ),
            MatchOutcome::AlreadySettled {
                stay_id,
                payment_id,
            } => tracing::info!(
                transfer_id = event.transfer_id,
                stay_id,
                payment_id,
                outcome,
                "transfer references a settled payment"
            ),
        }
    }
}

/// Keeps every emitted event in memory so callers can inspect a run.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<MatchEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MatchEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn kinds(&self) -> Vec<OutcomeKind> {
        self.events().iter().map(|e| e.outcome.kind()).collect()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: &MatchEvent) {
        let mut events = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        events.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_memory_sink_keeps_emission_order() {
        let sink = MemoryEventSink::new();
        for (transfer_id, outcome) in [
            (3, MatchOutcome::StayNotFound { stay_id: 11 }),
            (4, MatchOutcome::Unparseable),
        ] {
            let event = MatchEvent {
                transfer_id,
                outcome,
                at: Utc::now(),
            };
            TracingEventSink.emit(&event);
            sink.emit(&event);
        }

        assert_eq!(
            sink.kinds(),
            vec![OutcomeKind::StayNotFound, OutcomeKind::Unparseable]
        );
        assert_eq!(sink.events()[1].transfer_id, 4);
    }
}
