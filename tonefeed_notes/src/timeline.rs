// Caller-side accumulation of producer output for one media item.
//
// The producers are re-entrant and remember nothing between calls, so a
// player that asks for overlapping windows (seeking, prefetching the next
// segment) gets the same notes more than once. `NoteTimeline` merges those
// results: events whose id it already holds are dropped, the rest are kept in
// onset order, and the windows already produced are recorded so the caller
// can skip a repeat request entirely.
//
// Ids are only unique per producer; keep one timeline per producer and item.

use crate::note::{NoteEvent, sort_events};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct NoteTimeline {
    events: Vec<NoteEvent>,
    ids: BTreeSet<String>,
    /// Disjoint, sorted `[start, end)` spans already produced.
    produced: Vec<(f64, f64)>,
}

impl NoteTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All events, sorted by onset.
    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    /// Merge `events`, skipping ids already present. Returns how many were
    /// added.
    pub fn insert(&mut self, events: impl IntoIterator<Item = NoteEvent>) -> usize {
        let before = self.events.len();
        for event in events {
            if self.ids.insert(event.id.clone()) {
                self.events.push(event);
            }
        }
        let added = self.events.len() - before;
        if added > 0 {
            sort_events(&mut self.events);
        }
        added
    }

    /// Events starting in `[start, end)`.
    pub fn window(&self, start: f64, end: f64) -> &[NoteEvent] {
        let lo = self.events.partition_point(|e| e.start_time < start);
        let hi = self.events.partition_point(|e| e.start_time < end);
        &self.events[lo..hi.max(lo)]
    }

    /// Record that `[start, end)` has been produced.
    pub fn mark_produced(&mut self, start: f64, end: f64) {
        if start.is_nan() || end.is_nan() || start >= end {
            return;
        }
        let mut merged = (start, end);
        let mut spans = Vec::with_capacity(self.produced.len() + 1);
        for &(s, e) in &self.produced {
            if e < merged.0 || s > merged.1 {
                spans.push((s, e));
            } else {
                merged = (merged.0.min(s), merged.1.max(e));
            }
        }
        spans.push(merged);
        spans.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.produced = spans;
    }

    /// Whether `[start, end)` lies inside a single produced span.
    pub fn covers(&self, start: f64, end: f64) -> bool {
        self.produced.iter().any(|&(s, e)| s <= start && end <= e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, t: f64) -> NoteEvent {
        NoteEvent {
            id: id.to_string(),
            start_time: t,
            duration: 0.5,
            midi_pitch: 60,
            velocity: 0.7,
            confidence: 0.9,
        }
    }

    #[test]
    fn test_insert_deduplicates_by_id() {
        let mut timeline = NoteTimeline::new();
        assert_eq!(timeline.insert(vec![event("a", 1.0), event("b", 0.5)]), 2);
        assert_eq!(timeline.insert(vec![event("b", 0.5), event("c", 0.0)]), 1);
        let ids: Vec<&str> = timeline.events().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["c", "b", "a"]);
        assert_eq!(timeline.len(), 3);
    }

    #[test]
    fn test_window() {
        let mut timeline = NoteTimeline::new();
        timeline.insert((0..10).map(|i| event(&format!("n{i}"), i as f64)));
        let ids: Vec<&str> = timeline.window(2.0, 5.0).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["n2", "n3", "n4"]);
        assert!(timeline.window(5.0, 2.0).is_empty());
        assert!(timeline.window(20.0, 30.0).is_empty());
    }

    #[test]
    fn test_produced_spans_merge() {
        let mut timeline = NoteTimeline::new();
        assert!(!timeline.covers(0.0, 1.0));
        timeline.mark_produced(0.0, 10.0);
        timeline.mark_produced(20.0, 30.0);
        assert!(timeline.covers(2.0, 8.0));
        assert!(!timeline.covers(5.0, 25.0));
        timeline.mark_produced(10.0, 20.0);
        assert!(timeline.covers(5.0, 25.0));
        timeline.mark_produced(3.0, 3.0);
        assert!(timeline.covers(0.0, 30.0));
    }
}
