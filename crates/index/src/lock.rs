//! Reader-priority read/write lock.
//!
//! Readers proceed unless a writer is active. Writers proceed only when no reader is active or
//! waiting and no other writer is active; waiting writers are served in FIFO order. Releasing a
//! writer lets every waiting reader in at once before the next queued writer.
//!
//! Admission is decided by [`PriorityGate`], one mutex-guarded state object with two condition
//! variables. The protected value sits in a `parking_lot::RwLock` that the gate never lets
//! contend, so the guard types stay free of `unsafe`.

use parking_lot::{Condvar, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};

#[derive(Debug, Default)]
struct GateState {
    /// Active plus waiting readers.
    readers: usize,
    writer_active: bool,
    /// Tickets of writers waiting for their turn.
    queue: VecDeque<u64>,
    /// Ticket of the writer that has been handed the lock but has not woken yet.
    granted: Option<u64>,
    next_ticket: u64,
}

impl GateState {
    fn grant_next_writer(&mut self, writers: &Condvar) {
        if let Some(ticket) = self.queue.pop_front() {
            self.writer_active = true;
            self.granted = Some(ticket);
            writers.notify_all();
        }
    }
}

/// Admission control without protected data. Not reentrant: a thread must not enter twice.
#[derive(Debug, Default)]
pub struct PriorityGate {
    state: Mutex<GateState>,
    readers: Condvar,
    writers: Condvar,
}

impl PriorityGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_read(&self) {
        let mut state = self.state.lock();
        state.readers += 1;
        while state.writer_active {
            self.readers.wait(&mut state);
        }
    }

    pub fn exit_read(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.readers > 0, "exit_read without enter_read");
        state.readers -= 1;
        if state.readers == 0 && !state.writer_active {
            state.grant_next_writer(&self.writers);
        }
    }

    pub fn enter_write(&self) {
        let mut state = self.state.lock();
        if !state.writer_active && state.readers == 0 && state.queue.is_empty() {
            state.writer_active = true;
            return;
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.queue.push_back(ticket);
        while state.granted != Some(ticket) {
            self.writers.wait(&mut state);
        }
        state.granted = None;
    }

    pub fn exit_write(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.writer_active, "exit_write without enter_write");
        state.writer_active = false;
        if state.readers > 0 {
            self.readers.notify_all();
        } else {
            state.grant_next_writer(&self.writers);
        }
    }

    /// Number of writers queued behind the active holder.
    #[must_use]
    pub fn queued_writers(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Active plus waiting readers.
    #[must_use]
    pub fn readers(&self) -> usize {
        self.state.lock().readers
    }
}

/// Value guarded by a [`PriorityGate`].
#[derive(Debug, Default)]
pub struct PriorityRwLock<T> {
    gate: PriorityGate,
    data: RwLock<T>,
}

impl<T> PriorityRwLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            gate: PriorityGate::new(),
            data: RwLock::new(value),
        }
    }

    pub fn read(&self) -> PriorityReadGuard<'_, T> {
        self.gate.enter_read();
        PriorityReadGuard {
            guard: Some(self.data.read()),
            gate: &self.gate,
        }
    }

    pub fn write(&self) -> PriorityWriteGuard<'_, T> {
        self.gate.enter_write();
        PriorityWriteGuard {
            guard: Some(self.data.write()),
            gate: &self.gate,
        }
    }

    #[must_use]
    pub fn gate(&self) -> &PriorityGate {
        &self.gate
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

pub struct PriorityReadGuard<'a, T> {
    guard: Option<RwLockReadGuard<'a, T>>,
    gate: &'a PriorityGate,
}

impl<T> Deref for PriorityReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.guard.as_deref().unwrap_or_else(|| unreachable!("guard released"))
    }
}

impl<T> Drop for PriorityReadGuard<'_, T> {
    fn drop(&mut self) {
        // inner guard first, the gate may immediately admit a writer
        drop(self.guard.take());
        self.gate.exit_read();
    }
}

pub struct PriorityWriteGuard<'a, T> {
    guard: Option<RwLockWriteGuard<'a, T>>,
    gate: &'a PriorityGate,
}

impl<T> Deref for PriorityWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.guard.as_deref().unwrap_or_else(|| unreachable!("guard released"))
    }
}

impl<T> DerefMut for PriorityWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.guard
            .as_deref_mut()
            .unwrap_or_else(|| unreachable!("guard released"))
    }
}

impl<T> Drop for PriorityWriteGuard<'_, T> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.gate.exit_write();
    }
}
