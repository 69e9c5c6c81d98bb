//! Per-cycle typed key/value store.
//!
//! One [`CycleState`] lives for exactly one workload's scheduling cycle and
//! is shared by every phase and every host evaluated in it. Keys are typed:
//! a [`StateKey<T>`] can only write and read a `T`, so callers never
//! downcast by hand. Reads return an owned clone; a miss is reported as
//! `None`, never as a default value.
//!
//! # Concurrency model
//!
//! Filter and score may run on several threads at once for different
//! hosts. Entries are replaced whole under a `RwLock`, and values stored
//! here are either `Copy` data or immutable snapshots, so readers never
//! observe a partially written entry.

use std::any::{Any, type_name};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{PoisonError, RwLock};

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CycleStateError {
    #[error("cycle state entry {key} does not hold a {expected}")]
    TypeMismatch { key: String, expected: &'static str },
}

/// Name of a cycle state entry holding a `T`.
pub struct StateKey<T> {
    name: Cow<'static, str>,
    _value: PhantomData<fn() -> T>,
}

impl<T> StateKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            _value: PhantomData,
        }
    }

    pub fn owned(name: String) -> Self {
        Self {
            name: Cow::Owned(name),
            _value: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for StateKey<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            _value: PhantomData,
        }
    }
}

impl<T> fmt::Debug for StateKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateKey").field(&self.name).finish()
    }
}

type Entry = Box<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct CycleState {
    entries: RwLock<HashMap<String, Entry>>,
}

impl CycleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone of the stored value, or `None` when the key is absent.
    pub fn read<T>(&self, key: &StateKey<T>) -> Result<Option<T>, CycleStateError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key.name()) {
            None => Ok(None),
            Some(entry) => entry
                .downcast_ref::<T>()
                .cloned()
                .map(Some)
                .ok_or_else(|| CycleStateError::TypeMismatch {
                    key: key.name().to_string(),
                    expected: type_name::<T>(),
                }),
        }
    }

    pub fn write<T>(&self, key: &StateKey<T>, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.name().to_string(), Box::new(value));
    }

    /// Remove an entry. Returns true if it existed.
    pub fn delete<T>(&self, key: &StateKey<T>) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key.name())
            .is_some()
    }

    pub fn contains<T>(&self, key: &StateKey<T>) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key.name())
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<&String> = entries.keys().collect();
        keys.sort();
        f.debug_struct("CycleState").field("keys", &keys).finish()
    }
}
