//! Undo/Redo history.
//!
//! Every committed scene mutation is recorded as a `Change` carrying the
//! object's previous and current snapshots. Changes that must revert as one
//! step (multi-object delete, one eraser stroke over several objects, a
//! moved selection) are grouped into an atomic entry.
//!
//! The history never fails: anomalies are logged and the stacks are left
//! in their last consistent state.

use ink_core::ObjectSnapshot;
use ink_core::id::ObjectId;
use ink_core::transform::scale_placement;
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Which scene signal produced a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
    Erased,
}

/// One object's transition between two committed states.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub object: ObjectId,
    pub kind: ChangeKind,
    pub previous: ObjectSnapshot,
    pub current: ObjectSnapshot,
}

impl Change {
    pub fn new(
        object: ObjectId,
        kind: ChangeKind,
        previous: ObjectSnapshot,
        current: ObjectSnapshot,
    ) -> Self {
        Self {
            object,
            kind,
            previous,
            current,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEntry {
    Simple(Change),
    /// Changes that undo/redo as one step, in recorded order.
    Atomic(Vec<Change>),
}

impl HistoryEntry {
    pub fn changes(&self) -> &[Change] {
        match self {
            HistoryEntry::Simple(change) => std::slice::from_ref(change),
            HistoryEntry::Atomic(changes) => changes,
        }
    }

    pub fn changes_mut(&mut self) -> &mut [Change] {
        match self {
            HistoryEntry::Simple(change) => std::slice::from_mut(change),
            HistoryEntry::Atomic(changes) => changes,
        }
    }
}

impl From<Change> for HistoryEntry {
    fn from(change: Change) -> Self {
        HistoryEntry::Simple(change)
    }
}

/// Scoped history suppression. While alive, `keep` is a no-op; dropping
/// it restores the previous state.
#[must_use = "suppression ends when the guard is dropped"]
pub struct IgnoreGuard {
    flag: Rc<Cell<bool>>,
    previous: bool,
}

impl Drop for IgnoreGuard {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

/// Bounded undo/redo stacks with atomic grouping.
pub struct History {
    undo_list: VecDeque<HistoryEntry>,
    redo_list: VecDeque<HistoryEntry>,
    undo_limit: usize,
    /// Atomic nesting depth (0 = not grouping).
    atomic_depth: usize,
    atomic_list: Vec<Change>,
    /// Entries pushed out by new changes, the undo limit or `clear`, not
    /// yet collected by the owner.
    dropped: Vec<HistoryEntry>,
    ignore: Rc<Cell<bool>>,
    debug: bool,
}

impl Default for History {
    fn default() -> Self {
        Self::new(10)
    }
}

impl History {
    pub fn new(undo_limit: usize) -> Self {
        Self {
            undo_list: VecDeque::with_capacity(undo_limit),
            redo_list: VecDeque::new(),
            undo_limit,
            atomic_depth: 0,
            atomic_list: Vec::new(),
            dropped: Vec::new(),
            ignore: Rc::new(Cell::new(false)),
            debug: false,
        }
    }

    /// Dump every stack change through `log::debug!`.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Record an entry. Buffered while an atomic group is open; otherwise
    /// clears the redo list and pushes onto the undo list.
    pub fn keep(&mut self, entry: impl Into<HistoryEntry>) {
        let entry = entry.into();
        if self.is_ignoring() {
            log::trace!("history: keep ignored");
            return;
        }
        if self.atomic_depth > 0 {
            match entry {
                HistoryEntry::Simple(change) => self.atomic_list.push(change),
                HistoryEntry::Atomic(changes) => {
                    log::warn!(
                        "history: atomic entry kept inside an open group, flattening {} changes",
                        changes.len()
                    );
                    self.atomic_list.extend(changes);
                }
            }
            return;
        }
        self.dropped.extend(self.redo_list.drain(..));
        self.dropped
            .extend(Self::push_capped(&mut self.undo_list, entry, self.undo_limit));
        self.print();
    }

    /// Open an atomic group. Nested calls only deepen the group.
    pub fn atomic_start(&mut self) {
        if self.atomic_depth == 0 {
            self.atomic_list.clear();
        }
        self.atomic_depth += 1;
    }

    /// Close an atomic group. When the outermost group closes, buffered
    /// changes are kept as one entry; an empty group keeps nothing.
    pub fn atomic_end(&mut self) {
        if self.atomic_depth == 0 {
            return;
        }
        self.atomic_depth -= 1;
        if self.atomic_depth == 0 && !self.atomic_list.is_empty() {
            let changes = std::mem::take(&mut self.atomic_list);
            self.keep(HistoryEntry::Atomic(changes));
        }
    }

    pub fn is_atomic(&self) -> bool {
        self.atomic_depth > 0
    }

    /// Pop the newest entry onto the redo list and return it.
    pub fn undo(&mut self) -> Option<HistoryEntry> {
        let entry = self.undo_list.pop_back()?;
        self.dropped
            .extend(Self::push_capped(&mut self.redo_list, entry.clone(), self.undo_limit));
        self.print();
        Some(entry)
    }

    /// Pop the newest redo entry and return it. The caller replays it and
    /// hands it back through [`History::recommit`].
    pub fn redo(&mut self) -> Option<HistoryEntry> {
        let entry = self.redo_list.pop_back();
        self.print();
        entry
    }

    /// Push a replayed redo entry back onto the undo list. Unlike `keep`,
    /// this leaves the remaining redo entries in place.
    pub fn recommit(&mut self, entry: HistoryEntry) {
        self.dropped
            .extend(Self::push_capped(&mut self.undo_list, entry, self.undo_limit));
        self.print();
    }

    /// The newest undo entry.
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.undo_list.back()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_list.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_list.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_list.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_list.len()
    }

    /// Drop every entry. The dropped entries are reported through
    /// [`History::take_dropped`].
    pub fn clear(&mut self) {
        self.dropped.extend(self.undo_list.drain(..));
        self.dropped.extend(self.redo_list.drain(..));
        if !self.atomic_list.is_empty() {
            self.dropped
                .push(HistoryEntry::Atomic(std::mem::take(&mut self.atomic_list)));
        }
        self.atomic_depth = 0;
        self.print();
    }

    /// Take the entries dropped since the last call, oldest first. Objects
    /// only they referenced can no longer be restored.
    pub fn take_dropped(&mut self) -> Vec<HistoryEntry> {
        std::mem::take(&mut self.dropped)
    }

    /// Whether any kept or buffered change refers to `id`.
    pub fn references(&self, id: ObjectId) -> bool {
        let mentions = |entry: &HistoryEntry| entry.changes().iter().any(|c| c.object == id);
        self.undo_list.iter().any(mentions)
            || self.redo_list.iter().any(mentions)
            || self.atomic_list.iter().any(|c| c.object == id)
    }

    /// Scale the placements of every recorded snapshot about the canvas
    /// origin, so entries kept before a zoom or resize restore geometry in
    /// the new frame. Changes to `except` are left untouched.
    pub fn rescale(&mut self, fx: f64, fy: f64, except: Option<ObjectId>) {
        let scale = |change: &mut Change| {
            if Some(change.object) == except {
                return;
            }
            scale_placement(&mut change.previous.state.placement, fx, fy);
            scale_placement(&mut change.current.state.placement, fx, fy);
        };
        self.undo_list
            .iter_mut()
            .chain(self.redo_list.iter_mut())
            .flat_map(HistoryEntry::changes_mut)
            .for_each(scale);
        self.atomic_list.iter_mut().for_each(scale);
    }

    /// Suppress `keep` until the returned guard is dropped.
    pub fn suppress(&self) -> IgnoreGuard {
        let previous = self.ignore.replace(true);
        IgnoreGuard {
            flag: Rc::clone(&self.ignore),
            previous,
        }
    }

    pub fn is_ignoring(&self) -> bool {
        self.ignore.get()
    }

    /// Push onto a bounded list, returning whatever fell off the front.
    fn push_capped(
        list: &mut VecDeque<HistoryEntry>,
        entry: HistoryEntry,
        limit: usize,
    ) -> Vec<HistoryEntry> {
        if limit == 0 {
            return vec![entry];
        }
        list.push_back(entry);
        let excess = list.len().saturating_sub(limit);
        list.drain(..excess).collect()
    }

    fn print(&self) {
        if !self.debug {
            return;
        }
        let summarize = |list: &VecDeque<HistoryEntry>| {
            list.iter()
                .map(|e| match e {
                    HistoryEntry::Simple(c) => format!("{}:{:?}", c.object, c.kind),
                    HistoryEntry::Atomic(cs) => format!("atomic[{}]", cs.len()),
                })
                .collect::<Vec<_>>()
                .join(", ")
        };
        log::debug!(
            "history: undo [{}] | redo [{}]",
            summarize(&self.undo_list),
            summarize(&self.redo_list)
        );
    }
}
