use crate::error::{IndexError, Result};
use crate::lock::PriorityRwLock;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Locking strategies selectable for a [`crate::GuardedIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockingStrategy {
    Exclusive,
    PrioritizedReadWrite,
}

/// Value behind a locking strategy.
#[derive(Debug)]
pub(crate) enum Guarded<T> {
    Exclusive(Mutex<T>),
    Prioritized(PriorityRwLock<T>),
    /// Frozen copy: reads take no lock, writes are rejected.
    Snapshot(T),
}

impl<T> Guarded<T> {
    pub(crate) fn new(strategy: LockingStrategy, value: T) -> Self {
        match strategy {
            LockingStrategy::Exclusive => Self::Exclusive(Mutex::new(value)),
            LockingStrategy::PrioritizedReadWrite => Self::Prioritized(PriorityRwLock::new(value)),
        }
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match self {
            Self::Exclusive(lock) => f(&*lock.lock()),
            Self::Prioritized(lock) => f(&*lock.read()),
            Self::Snapshot(value) => f(value),
        }
    }

    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        match self {
            Self::Exclusive(lock) => Ok(f(&mut *lock.lock())),
            Self::Prioritized(lock) => Ok(f(&mut *lock.write())),
            Self::Snapshot(_) => Err(IndexError::ReadOnly),
        }
    }
}
