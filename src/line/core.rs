// src/line/core.rs

//! Pure bookkeeping core of a production line.
//!
//! `LineCore` owns the `pending` / `active` / `completed` collections and
//! nothing else: no services, no locks, no continuations. Every mutating
//! call that can free capacity returns the items that must be launched now,
//! so "record completion, compute capacity, dequeue" is a single call.
//!
//! The async shell (`line::production_line::ProductionLine`) only ever calls
//! into the core from its serialized context.

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, warn};

use crate::errors::{FlowError, Result};

/// Identifier assigned to every item a line accepts.
pub type ItemId = u64;

/// A finished item's result.
#[derive(Debug)]
pub struct Completed<O> {
    pub id: ItemId,
    pub result: Result<O>,
}

/// An item the core refused, returned so the caller decides where it drops.
#[derive(Debug)]
pub struct Rejected<P> {
    pub error: FlowError,
    pub item: P,
}

/// Where an item currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemLocation {
    Pending,
    Active,
    /// Finished, with the result still waiting in `completed`.
    Completed,
}

/// Point-in-time sizes of the line's collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineSnapshot {
    pub pending: usize,
    pub active: usize,
    /// Completed results not yet taken.
    pub completed: usize,
    /// Every item ever finished (including delivered and taken ones).
    pub finished_total: u64,
    pub closed: bool,
}

#[derive(Debug)]
pub struct LineCore<P, O> {
    max_count: usize,
    pending: VecDeque<(ItemId, P)>,
    active: BTreeSet<ItemId>,
    completed: Vec<Completed<O>>,
    finished_total: u64,
    next_id: ItemId,
    closed: bool,
}

impl<P, O> LineCore<P, O> {
    pub fn new(max_count: usize) -> Result<Self> {
        if max_count == 0 {
            return Err(FlowError::InvalidCapacity(max_count));
        }
        Ok(Self {
            max_count,
            pending: VecDeque::new(),
            active: BTreeSet::new(),
            completed: Vec::new(),
            finished_total: 0,
            next_id: 0,
            closed: false,
        })
    }

    pub fn max_count(&self) -> usize {
        self.max_count
    }

    /// Accept an item at the back of the pending queue.
    ///
    /// Callers follow up with [`activate_next`](Self::activate_next). A
    /// closed core hands the item back inside [`Rejected`].
    pub fn enqueue(&mut self, item: P) -> std::result::Result<ItemId, Rejected<P>> {
        if self.closed {
            return Err(Rejected {
                error: FlowError::Closed,
                item,
            });
        }
        self.next_id += 1;
        let id = self.next_id;
        self.pending.push_back((id, item));
        Ok(id)
    }

    /// Move as many pending items to `active` as capacity allows, in FIFO
    /// order, and return them for launching.
    pub fn activate_next(&mut self) -> Vec<(ItemId, P)> {
        let room = self.max_count.saturating_sub(self.active.len());
        let take = room.min(self.pending.len());
        let started: Vec<(ItemId, P)> = self.pending.drain(..take).collect();
        for (id, _) in &started {
            self.active.insert(*id);
        }
        if !started.is_empty() {
            debug!(
                started = started.len(),
                active = self.active.len(),
                pending = self.pending.len(),
                "activated pending items"
            );
        }
        started
    }

    /// Record a finished item's result and refill capacity.
    pub fn complete(&mut self, id: ItemId, result: Result<O>) -> Vec<(ItemId, P)> {
        if self.retire(id) {
            self.completed.push(Completed { id, result });
        }
        self.activate_next()
    }

    /// Like [`complete`](Self::complete), for an item whose result went
    /// directly to its submitter.
    pub fn complete_delivered(&mut self, id: ItemId) -> Vec<(ItemId, P)> {
        self.retire(id);
        self.activate_next()
    }

    fn retire(&mut self, id: ItemId) -> bool {
        if self.active.remove(&id) {
            self.finished_total += 1;
            true
        } else {
            warn!(id, "completion for an item that is not active; ignoring");
            false
        }
    }

    /// Drop every not-yet-started item, returning them.
    pub fn clear_pending(&mut self) -> Vec<(ItemId, P)> {
        let dropped: Vec<_> = self.pending.drain(..).collect();
        if !dropped.is_empty() {
            debug!(dropped = dropped.len(), "cleared pending items");
        }
        dropped
    }

    pub fn take_completed(&mut self) -> Vec<Completed<O>> {
        std::mem::take(&mut self.completed)
    }

    /// Refuse further items. Pending and active items still run.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// No active and no pending work.
    pub fn is_idle(&self) -> bool {
        self.active.is_empty() && self.pending.is_empty()
    }

    /// `None` once an item's result has been delivered or taken, or the item
    /// was cleared before it started.
    pub fn location(&self, id: ItemId) -> Option<ItemLocation> {
        if self.active.contains(&id) {
            Some(ItemLocation::Active)
        } else if self.pending.iter().any(|(pid, _)| *pid == id) {
            Some(ItemLocation::Pending)
        } else if self.completed.iter().any(|c| c.id == id) {
            Some(ItemLocation::Completed)
        } else {
            None
        }
    }

    /// Entries the core still holds: pending items, active ids and untaken
    /// results. Retired items leave nothing behind.
    pub fn retained(&self) -> usize {
        self.pending.len() + self.active.len() + self.completed.len()
    }

    pub fn active_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.active.iter().copied()
    }

    pub fn pending_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.pending.iter().map(|(id, _)| *id)
    }

    pub fn snapshot(&self) -> LineSnapshot {
        LineSnapshot {
            pending: self.pending.len(),
            active: self.active.len(),
            completed: self.completed.len(),
            finished_total: self.finished_total,
            closed: self.closed,
        }
    }
}
