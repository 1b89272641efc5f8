//! Per-attempt log of reversible structural edits to the program image.

use tracing::debug;

use crate::image::{ContainerPath, ProgramImage};

/// One structural addition to the program image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoEntry {
    /// `child` (a namespace or type) was added under the container at
    /// `parent`.
    ContainerAdded { parent: ContainerPath, child: String },
}

#[derive(Debug, Default)]
pub struct UndoLog {
    entries: Vec<UndoEntry>,
}

impl UndoLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: UndoEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replay every entry in reverse insertion order, then clear the log.
    ///
    /// Calling this on an empty log is a no-op.
    pub fn execute_undo(&mut self, image: &mut ProgramImage) {
        if !self.entries.is_empty() {
            debug!(entries = self.entries.len(), "replaying undo log");
        }
        while let Some(entry) = self.entries.pop() {
            match entry {
                UndoEntry::ContainerAdded { parent, child } => {
                    image.remove_child(&parent, &child);
                }
            }
        }
    }

    /// Drop the entries without replaying them.
    pub fn discard(&mut self) {
        self.entries.clear();
    }
}
