//! Deferred callbacks on the engine's clock
//!
//! Entries carry the generation they were scheduled under. `cancel_all`
//! bumps the generation and drops everything pending, so a callback that
//! was already handed out can still be recognised as stale by its token.

/// Identifies which generation a timer belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

/// A timer handed back by [`TimerQueue::pop_due`]
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<E> {
    pub token: TimerToken,
    /// When it was scheduled for, which may be earlier than the poll time
    pub due_at: f64,
    pub event: E,
}

#[derive(Debug, Clone)]
struct Entry<E> {
    due_at: f64,
    seq: u64,
    token: TimerToken,
    event: E,
}

/// Pending events ordered by due time (ties fire in scheduling order)
#[derive(Debug, Clone)]
pub struct TimerQueue<E> {
    entries: Vec<Entry<E>>,
    generation: u64,
    next_seq: u64,
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> TimerQueue<E> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            generation: 0,
            next_seq: 0,
        }
    }

    /// Current generation
    pub fn token(&self) -> TimerToken {
        TimerToken(self.generation)
    }

    pub fn is_current(&self, token: TimerToken) -> bool {
        token.0 == self.generation
    }

    pub fn schedule(&mut self, due_at: f64, event: E) -> TimerToken {
        let token = self.token();
        self.entries.push(Entry {
            due_at,
            seq: self.next_seq,
            token,
            event,
        });
        self.next_seq += 1;
        token
    }

    /// Drop every pending entry and invalidate outstanding tokens
    pub fn cancel_all(&mut self) {
        self.entries.clear();
        self.generation += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return the earliest entry due at or before `now`
    pub fn pop_due(&mut self, now: f64) -> Option<Fired<E>> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due_at <= now)
            .min_by(|(_, a), (_, b)| a.due_at.total_cmp(&b.due_at).then(a.seq.cmp(&b.seq)))
            .map(|(i, _)| i)?;
        let entry = self.entries.remove(idx);
        Some(Fired {
            token: entry.token,
            due_at: entry.due_at,
            event: entry.event,
        })
    }
}
