//! Undo interface for recording passes.

use crate::model::{RegionId, SelectionSnapshot};
use crate::{Error, Result};

/// One recording pass, as a single undoable action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordAction {
    /// Regions created during the pass, in creation order.
    pub regions: Vec<RegionId>,
    /// Selection before the pass started.
    pub before: SelectionSnapshot,
    /// Selection after the recorded regions were selected.
    pub after: SelectionSnapshot,
}

impl RecordAction {
    pub fn contains(&self, region: RegionId) -> bool {
        self.regions.contains(&region)
    }
}

/// Receives the action built at the end of each recording pass.
pub trait UndoSink {
    fn push_record_action(&mut self, action: RecordAction) -> Result<()>;
}

/// In-memory undo history.
#[derive(Debug, Default)]
pub struct UndoStack {
    done: Vec<RecordAction>,
    undone: Vec<RecordAction>,
    limit: Option<usize>,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `limit` actions, dropping the oldest.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }

    pub fn actions(&self) -> &[RecordAction] {
        &self.done
    }

    pub fn last(&self) -> Option<&RecordAction> {
        self.done.last()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    /// Pop the most recent action so the caller can revert it.
    pub fn undo(&mut self) -> Option<&RecordAction> {
        let action = self.done.pop()?;
        self.undone.push(action);
        self.undone.last()
    }

    pub fn redo(&mut self) -> Option<&RecordAction> {
        let action = self.undone.pop()?;
        self.done.push(action);
        self.done.last()
    }
}

impl UndoSink for UndoStack {
    fn push_record_action(&mut self, action: RecordAction) -> Result<()> {
        if action.regions.is_empty() {
            return Err(Error::Undo("record action without regions".into()));
        }
        self.undone.clear();
        self.done.push(action);
        if let Some(limit) = self.limit {
            let excess = self.done.len().saturating_sub(limit);
            self.done.drain(..excess);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(ids: &[u64]) -> RecordAction {
        RecordAction {
            regions: ids.iter().map(|&id| RegionId(id)).collect(),
            before: SelectionSnapshot::default(),
            after: SelectionSnapshot::new(ids.iter().map(|&id| RegionId(id))),
        }
    }

    #[test]
    fn test_push_undo_redo() {
        let mut stack = UndoStack::new();
        stack.push_record_action(action(&[1])).unwrap();
        stack.push_record_action(action(&[2, 3])).unwrap();
        assert_eq!(stack.len(), 2);
        assert!(stack.last().unwrap().contains(RegionId(3)));

        assert_eq!(stack.undo().unwrap().regions, vec![RegionId(2), RegionId(3)]);
        assert_eq!(stack.len(), 1);
        assert!(stack.can_redo());
        stack.redo().unwrap();
        assert_eq!(stack.len(), 2);

        stack.undo();
        stack.push_record_action(action(&[4])).unwrap();
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_empty_action_rejected() {
        let mut stack = UndoStack::new();
        assert!(matches!(
            stack.push_record_action(action(&[])),
            Err(Error::Undo(_))
        ));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut stack = UndoStack::with_limit(2);
        for id in 1..=3 {
            stack.push_record_action(action(&[id])).unwrap();
        }
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.actions()[0].regions, vec![RegionId(2)]);
    }
}
