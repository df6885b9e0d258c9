//! Event processing metrics collected by the runner when the resource is present.

use std::collections::BTreeMap;
use std::time::Instant;

use bevy_ecs::prelude::Resource;

use crate::clock::EventKind;

#[derive(Debug, Default, Resource)]
pub struct EventMetrics {
    pub events_processed: u64,
    /// Wall-clock start, for the processing rate.
    pub start_time: Option<Instant>,
    pub events_by_kind: BTreeMap<&'static str, u64>,
}

impl EventMetrics {
    pub fn record_event(&mut self, kind: &EventKind) {
        if self.start_time.is_none() {
            self.start_time = Some(Instant::now());
        }
        self.events_processed += 1;
        *self.events_by_kind.entry(kind.name()).or_insert(0) += 1;
    }

    pub fn count(&self, name: &str) -> u64 {
        self.events_by_kind.get(name).copied().unwrap_or(0)
    }

    /// Events per wall-clock second since the first recorded event.
    pub fn events_per_second(&self) -> f64 {
        let Some(start) = self.start_time else {
            return 0.0;
        };
        let elapsed = start.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.events_processed as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Summary lines, busiest kind first.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut entries: Vec<_> = self.events_by_kind.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let mut lines = vec![format!("events processed: {}", self.events_processed)];
        lines.extend(
            entries
                .into_iter()
                .map(|(kind, count)| format!("  {kind:28} : {count}")),
        );
        lines
    }
}
