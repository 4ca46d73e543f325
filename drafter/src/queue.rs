use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

/// Issue-order position of a point gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

type Cancelled = Arc<Mutex<Vec<Ticket>>>;

/// Claim on a slot in the point order. Dropping it without completing marks
/// the slot cancelled, so later completions are not held back by it.
#[derive(Debug)]
#[must_use = "dropping a ticket guard cancels its slot"]
pub struct TicketGuard {
    ticket: Ticket,
    cancelled: Option<Cancelled>,
}

impl TicketGuard {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    fn disarm(mut self) -> Ticket {
        self.cancelled = None;
        self.ticket
    }
}

impl Drop for TicketGuard {
    fn drop(&mut self) {
        let Some(cancelled) = self.cancelled.take() else {
            return;
        };
        if let Ok(mut cancelled) = cancelled.lock() {
            cancelled.push(self.ticket);
        };
    }
}

/// Re-orders asynchronous completions into issue order. Tickets are handed out
/// when a gesture happens; completions may arrive in any order and are only
/// released once every earlier ticket has completed or been cancelled.
#[derive(Debug)]
pub struct PointQueue<T> {
    next_ticket: u64,
    next_release: u64,
    /// `None` marks a cancelled slot.
    ready: BTreeMap<u64, Option<T>>,
    cancelled: Cancelled,
}

impl<T> Default for PointQueue<T> {
    fn default() -> Self {
        Self {
            next_ticket: 0,
            next_release: 0,
            ready: BTreeMap::new(),
            cancelled: Arc::default(),
        }
    }
}

impl<T> PointQueue<T> {
    pub fn issue(&mut self) -> TicketGuard {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        TicketGuard {
            ticket,
            cancelled: Some(Arc::clone(&self.cancelled)),
        }
    }

    /// Stores a completion and returns every value now releasable, in issue
    /// order. Completions for abandoned tickets are dropped.
    pub fn complete(&mut self, guard: TicketGuard, value: T) -> Vec<T> {
        let ticket = guard.disarm();
        self.collect_cancelled();
        if !self.is_outstanding(ticket) {
            tracing::debug!("dropping completion for stale ticket {}", ticket.0);
            return self.release();
        }
        self.ready.insert(ticket.0, Some(value));
        self.release()
    }

    /// Skips slots whose guards were dropped and returns the completions that
    /// were waiting behind them.
    pub fn release_cancelled(&mut self) -> Vec<T> {
        self.collect_cancelled();
        self.release()
    }

    /// Number of issued tickets not yet released.
    pub fn in_flight(&self) -> usize {
        (self.next_ticket - self.next_release) as usize
    }

    /// Abandons every outstanding ticket.
    pub fn abandon(&mut self) {
        if self.in_flight() > 0 {
            tracing::debug!("abandoning {} pending point(s)", self.in_flight());
        }
        self.next_release = self.next_ticket;
        self.ready.clear();
        self.collect_cancelled();
    }

    fn is_outstanding(&self, ticket: Ticket) -> bool {
        (self.next_release..self.next_ticket).contains(&ticket.0)
    }

    fn collect_cancelled(&mut self) {
        let cancelled = match self.cancelled.lock() {
            Ok(mut cancelled) => std::mem::take(&mut *cancelled),
            Err(_) => return,
        };
        for ticket in cancelled {
            if self.is_outstanding(ticket) {
                tracing::debug!("point ticket {} cancelled before completion", ticket.0);
                self.ready.insert(ticket.0, None);
            }
        }
    }

    fn release(&mut self) -> Vec<T> {
        let mut released = Vec::new();
        while let Some(slot) = self.ready.remove(&self.next_release) {
            released.extend(slot);
            self.next_release += 1;
        }
        released
    }
}
