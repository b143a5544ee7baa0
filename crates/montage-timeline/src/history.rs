//! Undo/redo history over edit commands.
//!
//! The history engine is the single writer for the timeline model: callers
//! hand it a command and a sequence, and it owns the bounded undo and redo
//! stacks. A failed command is reported and never pushed, so the stacks can
//! not be corrupted by a rejected edit.

use crate::command::{CommandError, EditCommand};
use crate::project::{now_ms, Sequence};
use montage_core::defaults::HISTORY_DEPTH;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One executed command with its display metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub command: EditCommand,
    pub description: String,
    pub executed_at_ms: u64,
}

/// Bounded undo/redo stacks.
#[derive(Debug)]
pub struct History {
    undo: Vec<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    max_depth: usize,
}

impl History {
    /// Create a history with the given maximum depth.
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            max_depth,
        }
    }

    /// Execute a command against a sequence. On success the command is
    /// pushed onto the undo stack and the redo stack is cleared; on failure
    /// the sequence and both stacks are unchanged.
    pub fn execute(
        &mut self,
        seq: &mut Sequence,
        mut command: EditCommand,
    ) -> Result<(), CommandError> {
        let description = command.describe();
        command.apply(seq)?;
        debug!(action = %description, "edit applied");
        self.redo.clear();
        self.undo.push(HistoryEntry {
            command,
            description,
            executed_at_ms: now_ms(),
        });
        if self.undo.len() > self.max_depth {
            self.undo.remove(0);
        }
        Ok(())
    }

    /// Undo the most recent command. Returns false (and changes nothing)
    /// when the undo stack is empty or the stored state cannot be reverted.
    pub fn undo(&mut self, seq: &mut Sequence) -> bool {
        let Some(mut entry) = self.undo.pop() else {
            return false;
        };
        match entry.command.undo(seq) {
            Ok(()) => {
                self.redo.push(entry);
                true
            }
            Err(_) => {
                // Put it back; the model was not touched.
                self.undo.push(entry);
                false
            }
        }
    }

    /// Re-apply the most recently undone command. Returns false (and
    /// changes nothing) when the redo stack is empty.
    pub fn redo(&mut self, seq: &mut Sequence) -> bool {
        let Some(mut entry) = self.redo.pop() else {
            return false;
        };
        match entry.command.apply(seq) {
            Ok(()) => {
                entry.executed_at_ms = now_ms();
                self.undo.push(entry);
                true
            }
            Err(_) => {
                self.redo.push(entry);
                false
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Descriptions of pending undo entries, most recent first.
    pub fn undo_labels(&self) -> Vec<&str> {
        self.undo
            .iter()
            .rev()
            .map(|e| e.description.as_str())
            .collect()
    }

    /// Drop all history.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(HISTORY_DEPTH)
    }
}
