//! Thread-safe in-memory state management
//!
//! Readers share an `RwLock`; writers go through [`StateEngine::commit`], which
//! validates, persists and applies an event while holding the write lock, so a
//! reader only ever sees fully committed state.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{EngineError, EngineResult, Event};

/// Thread-safe state container with concurrent read access
///
/// # Example
///
/// ```rust,ignore
/// let engine = StateEngine::new(vec![1, 2, 3]);
/// let count = engine.with_state(|state| state.len())?;
/// ```
pub struct StateEngine<S> {
    state: Arc<RwLock<S>>,
}

impl<S> StateEngine<S> {
    /// Create a new state engine with the given initial state
    pub fn new(initial_state: S) -> Self {
        Self { state: Arc::new(RwLock::new(initial_state)) }
    }

    /// Execute a read-only operation on the state
    pub fn with_state<F, R>(&self, f: F) -> EngineResult<R>
    where
        F: FnOnce(&S) -> R,
    {
        let guard = self.read()?;
        Ok(f(&*guard))
    }

    /// Execute a mutable operation on the state, bypassing the journal.
    ///
    /// Only used while replaying events that are already durable.
    pub fn with_state_mut<F, R>(&self, f: F) -> EngineResult<R>
    where
        F: FnOnce(&mut S) -> R,
    {
        let mut guard = self.write()?;
        Ok(f(&mut *guard))
    }

    /// Commit one event atomically.
    ///
    /// `prepare` inspects the current state and builds the event together with
    /// the value handed back to the caller (or rejects the change); `persist`
    /// makes the event durable. The event is applied only when both succeed,
    /// so on any error the state is left exactly as it was.
    pub fn commit<E, R, P, W, Err>(&self, prepare: P, persist: W) -> Result<R, Err>
    where
        E: Event<State = S>,
        P: FnOnce(&S) -> Result<(E, R), Err>,
        W: FnOnce(&E) -> Result<(), Err>,
        Err: From<EngineError>,
    {
        let mut guard = self.write()?;
        let (event, output) = prepare(&*guard)?;
        persist(&event)?;
        event.apply(&mut *guard);
        Ok(output)
    }

    /// Get a read guard for direct access to the state
    pub fn read(&self) -> EngineResult<RwLockReadGuard<'_, S>> {
        self.state.read().map_err(|e| {
            EngineError::ConcurrencyError(format!("Failed to acquire read lock: {}", e))
        })
    }

    fn write(&self) -> EngineResult<RwLockWriteGuard<'_, S>> {
        self.state.write().map_err(|e| {
            EngineError::ConcurrencyError(format!("Failed to acquire write lock: {}", e))
        })
    }

    /// Clone the current state
    pub fn snapshot(&self) -> EngineResult<S>
    where
        S: Clone,
    {
        self.with_state(|state| state.clone())
    }
}

impl<S> Clone for StateEngine<S> {
    fn clone(&self) -> Self {
        Self { state: Arc::clone(&self.state) }
    }
}
