use shared::{Segment, Status};

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Deep copy of everything undo/redo restores.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySnapshot {
    pub segments: Vec<Segment>,
    pub current_segment: Segment,
    pub status: Status,
    pub route_name: String,
}

/// Undo/redo stacks. The top of the undo stack is always the current state,
/// so the stack never drops below one entry.
#[derive(Debug)]
pub struct History {
    undo_stack: Vec<HistorySnapshot>,
    redo_stack: Vec<HistorySnapshot>,
    restoring: bool,
    limit: usize,
}

impl History {
    pub fn new(initial: HistorySnapshot, limit: usize) -> Self {
        Self {
            undo_stack: vec![initial],
            redo_stack: Vec::new(),
            restoring: false,
            limit: limit.max(1),
        }
    }

    /// Forgets everything and starts over from `initial`.
    pub fn reset(&mut self, initial: HistorySnapshot) {
        self.undo_stack.clear();
        self.undo_stack.push(initial);
        self.redo_stack.clear();
        self.restoring = false;
    }

    /// Records a new state. Ignored while a snapshot is being applied, so a
    /// restore never re-records the state it restores.
    pub fn push(&mut self, snapshot: HistorySnapshot) -> bool {
        if self.restoring {
            tracing::debug!("history push suppressed during restore");
            return false;
        }
        self.undo_stack.push(snapshot);
        self.trim();
        self.redo_stack.clear();
        true
    }

    /// Returns the state to apply, or `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<HistorySnapshot> {
        if self.undo_stack.len() < 2 {
            return None;
        }
        let current = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        self.undo_stack.last().cloned()
    }

    pub fn redo(&mut self) -> Option<HistorySnapshot> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(next.clone());
        self.trim();
        Some(next)
    }

    pub fn begin_restore(&mut self) {
        self.restoring = true;
    }

    pub fn end_restore(&mut self) {
        self.restoring = false;
    }

    pub fn is_restoring(&self) -> bool {
        self.restoring
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn current(&self) -> Option<&HistorySnapshot> {
        self.undo_stack.last()
    }

    fn trim(&mut self) {
        if self.undo_stack.len() > self.limit {
            let excess = self.undo_stack.len() - self.limit;
            self.undo_stack.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::SurfaceType;

    fn snapshot(name: &str) -> HistorySnapshot {
        HistorySnapshot {
            segments: Vec::new(),
            current_segment: Segment::new("Segment 1", SurfaceType::FOREST_TRAIL),
            status: Status::Preliminary,
            route_name: name.to_string(),
        }
    }

    #[test]
    fn test_fresh_history_cannot_undo_or_redo() {
        let mut history = History::new(snapshot("initial"), 10);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
        assert_eq!(history.undo_depth(), 1);
    }

    #[test]
    fn test_undo_returns_previous_and_redo_returns_next() {
        let mut history = History::new(snapshot("a"), 10);
        history.push(snapshot("b"));
        history.push(snapshot("c"));

        assert_eq!(history.undo().unwrap().route_name, "b");
        assert_eq!(history.undo().unwrap().route_name, "a");
        assert!(history.undo().is_none());

        assert_eq!(history.redo().unwrap().route_name, "b");
        assert_eq!(history.redo().unwrap().route_name, "c");
        assert!(history.redo().is_none());
        assert_eq!(history.current().unwrap().route_name, "c");
    }

    #[test]
    fn test_push_clears_redo() {
        let mut history = History::new(snapshot("a"), 10);
        history.push(snapshot("b"));
        history.undo();
        assert!(history.can_redo());

        history.push(snapshot("c"));
        assert!(!history.can_redo());
        assert_eq!(history.undo().unwrap().route_name, "a");
    }

    #[test]
    fn test_push_suppressed_while_restoring() {
        let mut history = History::new(snapshot("a"), 10);
        history.push(snapshot("b"));
        let restored = history.undo().unwrap();

        history.begin_restore();
        assert!(!history.push(restored));
        history.end_restore();

        // Still one step of redo and nothing extra on the undo stack.
        assert_eq!(history.undo_depth(), 1);
        assert_eq!(history.redo_depth(), 1);
    }

    #[test]
    fn test_limit_drops_oldest_entries() {
        let mut history = History::new(snapshot("0"), 3);
        for i in 1..=5 {
            history.push(snapshot(&i.to_string()));
        }
        assert_eq!(history.undo_depth(), 3);
        assert_eq!(history.undo().unwrap().route_name, "4");
        assert_eq!(history.undo().unwrap().route_name, "3");
        assert!(history.undo().is_none());
    }

    #[test]
    fn test_reset_starts_over() {
        let mut history = History::new(snapshot("a"), 10);
        history.push(snapshot("b"));
        history.undo();
        history.reset(snapshot("fresh"));

        assert_eq!(history.undo_depth(), 1);
        assert!(!history.can_redo());
        assert_eq!(history.current().unwrap().route_name, "fresh");
    }
}
