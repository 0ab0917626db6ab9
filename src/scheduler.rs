//! Virtual-time event queue.
//!
//! All analog recomputation in the core is deferred through the scheduler so
//! it interleaves deterministically with CPU execution and solver
//! notifications. [`EventQueue`] is the reference [`Scheduler`]: a min-heap
//! keyed by `(time, sequence)`, so events queued for the same instant run in
//! the order they were queued.

use crate::devices::ContourKind;
use crate::services::Scheduler;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

/// Deferred work the machine dispatches when it comes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MachineEvent {
    /// Recompute a contour's effective resistance and target voltage.
    UpdateContour(ContourKind),
    /// Recompute the LFO half-period and re-arm its timer.
    UpdateLfoTimer,
    /// LFO half-cycle elapsed. Ticks from a timer generation that has since
    /// been re-armed or stopped are dropped.
    LfoTick {
        /// Timer generation the tick was scheduled under.
        generation: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueuedEvent {
    at: Duration,
    seq: u64,
    event: MachineEvent,
}

impl Ord for QueuedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at
            .cmp(&other.at)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Time-ordered queue of [`MachineEvent`]s with a virtual clock.
///
/// # Examples
///
/// ```rust
/// use moog_source::{EventQueue, MachineEvent, Scheduler};
/// use std::time::Duration;
///
/// let mut queue = EventQueue::new();
/// queue.schedule_at(Duration::from_millis(5), MachineEvent::UpdateLfoTimer);
/// queue.synchronize(MachineEvent::LfoTick { generation: 1 });
///
/// // The synchronized event is due now, the other one later.
/// assert_eq!(
///     queue.next_due(Duration::from_millis(10)),
///     Some(MachineEvent::LfoTick { generation: 1 })
/// );
/// assert_eq!(
///     queue.next_due(Duration::from_millis(10)),
///     Some(MachineEvent::UpdateLfoTimer)
/// );
/// assert_eq!(queue.now(), Duration::from_millis(5));
/// ```
#[derive(Debug, Default)]
pub struct EventQueue {
    now: Duration,
    next_seq: u64,
    heap: BinaryHeap<Reverse<QueuedEvent>>,
}

impl EventQueue {
    /// Create an empty queue at virtual time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True if no events are pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Timestamp of the earliest pending event.
    pub fn peek_time(&self) -> Option<Duration> {
        self.heap.peek().map(|Reverse(queued)| queued.at)
    }

    /// Move the clock forward to `t`. Moving backwards is ignored.
    pub fn advance_to(&mut self, t: Duration) {
        if t > self.now {
            self.now = t;
        }
    }

    fn push(&mut self, at: Duration, event: MachineEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(QueuedEvent { at, seq, event }));
    }
}

impl Scheduler for EventQueue {
    fn now(&self) -> Duration {
        self.now
    }

    fn synchronize(&mut self, event: MachineEvent) {
        self.push(self.now, event);
    }

    fn schedule_at(&mut self, at: Duration, event: MachineEvent) {
        // Nothing may run in the past.
        self.push(at.max(self.now), event);
    }

    fn cancel_lfo_ticks(&mut self) {
        self.heap
            .retain(|Reverse(queued)| !matches!(queued.event, MachineEvent::LfoTick { .. }));
    }

    /// Pops the next event due at or before `deadline`. When nothing is due
    /// the clock advances to `deadline`.
    fn next_due(&mut self, deadline: Duration) -> Option<MachineEvent> {
        match self.heap.peek() {
            Some(Reverse(queued)) if queued.at <= deadline => {
                let Reverse(queued) = self.heap.pop()?;
                self.advance_to(queued.at);
                Some(queued.event)
            }
            _ => {
                self.advance_to(deadline);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_events_ordered_by_time() {
        let mut queue = EventQueue::new();
        queue.schedule_at(ms(3), MachineEvent::UpdateLfoTimer);
        queue.schedule_at(ms(1), MachineEvent::UpdateContour(ContourKind::Filter));

        assert_eq!(
            queue.next_due(ms(10)),
            Some(MachineEvent::UpdateContour(ContourKind::Filter))
        );
        assert_eq!(queue.now(), ms(1));
        assert_eq!(queue.next_due(ms(10)), Some(MachineEvent::UpdateLfoTimer));
        assert_eq!(queue.now(), ms(3));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_ties_are_fifo() {
        let mut queue = EventQueue::new();
        queue.synchronize(MachineEvent::UpdateContour(ContourKind::Loudness));
        queue.synchronize(MachineEvent::UpdateContour(ContourKind::Filter));
        queue.synchronize(MachineEvent::UpdateLfoTimer);

        assert_eq!(
            queue.next_due(Duration::ZERO),
            Some(MachineEvent::UpdateContour(ContourKind::Loudness))
        );
        assert_eq!(
            queue.next_due(Duration::ZERO),
            Some(MachineEvent::UpdateContour(ContourKind::Filter))
        );
        assert_eq!(
            queue.next_due(Duration::ZERO),
            Some(MachineEvent::UpdateLfoTimer)
        );
    }

    #[test]
    fn test_nothing_due_advances_clock() {
        let mut queue = EventQueue::new();
        queue.schedule_at(ms(20), MachineEvent::UpdateLfoTimer);

        assert_eq!(queue.next_due(ms(5)), None);
        assert_eq!(queue.now(), ms(5));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.peek_time(), Some(ms(20)));
    }

    #[test]
    fn test_past_schedule_clamped_to_now() {
        let mut queue = EventQueue::new();
        queue.advance_to(ms(10));
        queue.schedule_at(ms(2), MachineEvent::UpdateLfoTimer);

        assert_eq!(queue.peek_time(), Some(ms(10)));
    }

    #[test]
    fn test_cancel_lfo_ticks() {
        let mut queue = EventQueue::new();
        queue.schedule_at(ms(5), MachineEvent::LfoTick { generation: 1 });
        queue.schedule_at(ms(7), MachineEvent::UpdateLfoTimer);
        queue.schedule_at(ms(9), MachineEvent::LfoTick { generation: 2 });

        queue.cancel_lfo_ticks();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next_due(ms(10)), Some(MachineEvent::UpdateLfoTimer));
    }

    #[test]
    fn test_clock_never_moves_backwards() {
        let mut queue = EventQueue::new();
        queue.advance_to(ms(10));
        queue.advance_to(ms(4));
        assert_eq!(queue.now(), ms(10));
    }
}
