//! Scheduled events and their total order.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::grid::CellHash;

/// What an event does when it is dispatched.
///
/// The discriminants are the tie-break priority at equal times: ending
/// beats saving beats spreading beats igniting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventKind {
    End = 0,
    Save = 1,
    Spread = 2,
    NewFire = 3,
}

/// A scheduled occurrence in one scenario.
#[derive(Debug, Clone, Copy)]
pub struct Event {
    pub time: f64,
    pub kind: EventKind,
    pub cell: CellHash,
}

impl Event {
    #[must_use]
    pub fn end(time: f64) -> Self {
        Event {
            time,
            kind: EventKind::End,
            cell: 0,
        }
    }

    #[must_use]
    pub fn save(time: f64) -> Self {
        Event {
            time,
            kind: EventKind::Save,
            cell: 0,
        }
    }

    #[must_use]
    pub fn spread(time: f64) -> Self {
        Event {
            time,
            kind: EventKind::Spread,
            cell: 0,
        }
    }

    #[must_use]
    pub fn new_fire(time: f64, cell: CellHash) -> Self {
        Event {
            time,
            kind: EventKind::NewFire,
            cell,
        }
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.kind.cmp(&other.kind))
            .then_with(|| self.cell.cmp(&other.cell))
    }
}

/// The scenario's event queue: an ordered set popped front-first.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: BTreeSet<Event>,
}

impl EventQueue {
    pub fn push(&mut self, event: Event) {
        self.events.insert(event);
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_first()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_time_then_kind_then_cell() {
        let mut queue = EventQueue::default();
        queue.push(Event::new_fire(1.0, 5));
        queue.push(Event::spread(1.0));
        queue.push(Event::save(1.0));
        queue.push(Event::end(1.0));
        queue.push(Event::save(0.5));
        assert_eq!(queue.pop().unwrap().kind, EventKind::Save); // t=0.5
        assert_eq!(queue.pop().unwrap().kind, EventKind::End);
        assert_eq!(queue.pop().unwrap().kind, EventKind::Save);
        assert_eq!(queue.pop().unwrap().kind, EventKind::Spread);
        assert_eq!(queue.pop().unwrap().kind, EventKind::NewFire);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn equal_kind_ties_break_on_cell() {
        let mut queue = EventQueue::default();
        queue.push(Event::new_fire(1.0, 9));
        queue.push(Event::new_fire(1.0, 3));
        assert_eq!(queue.pop().unwrap().cell, 3);
        assert_eq!(queue.pop().unwrap().cell, 9);
    }
}
