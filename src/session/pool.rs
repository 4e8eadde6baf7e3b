//! Fixed-size session pool
//!
//! Sessions live in an arena of slots. The indices of idle slots sit in a
//! queue behind one mutex, and a semaphore holds exactly one permit per queued
//! index, so `acquire` suspends until some lease is dropped. A lease owns its
//! session outright while checked out; nothing else can reach it.

use crate::session::{Session, SessionError, SessionResult};
use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;

struct PoolState {
    slots: Vec<Option<Box<dyn Session>>>,
    available: VecDeque<usize>,
    closed: bool,
}

struct PoolInner {
    state: Mutex<PoolState>,
    permits: Semaphore,
    size: usize,
}

impl PoolInner {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // a panicking worker must not wedge every other worker
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn give_back(&self, slot: usize, session: Box<dyn Session>) {
        let mut state = self.lock();
        if state.closed {
            drop(state);
            destroy_detached(session);
            return;
        }

        state.slots[slot] = Some(session);
        state.available.push_back(slot);
        drop(state);
        self.permits.add_permits(1);
    }
}

/// Quits a session that came back after the pool was torn down
fn destroy_detached(mut session: Box<dyn Session>) {
    let id = session.id();
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                if let Err(e) = session.quit().await {
                    tracing::warn!("Failed to quit session {}: {}", id, e);
                }
            });
        }
        Err(_) => tracing::warn!("Session {} dropped outside a runtime without quitting", id),
    }
}

/// A pool lending sessions to one worker at a time
///
/// Cloning the pool yields another handle to the same sessions.
#[derive(Clone)]
pub struct SessionPool {
    inner: Arc<PoolInner>,
}

impl SessionPool {
    /// Creates a pool owning `sessions`; the pool size is their count
    ///
    /// # Returns
    ///
    /// * `Ok(SessionPool)` - The pool, every session idle
    /// * `Err(SessionError::EmptyPool)` - No sessions were supplied
    pub fn new(sessions: Vec<Box<dyn Session>>) -> SessionResult<Self> {
        if sessions.is_empty() {
            return Err(SessionError::EmptyPool);
        }

        let size = sessions.len();
        let slots = sessions.into_iter().map(Some).collect();
        let available = (0..size).collect();

        Ok(Self {
            inner: Arc::new(PoolInner {
                state: Mutex::new(PoolState {
                    slots,
                    available,
                    closed: false,
                }),
                permits: Semaphore::new(size),
                size,
            }),
        })
    }

    /// Creates a pool of `size` sessions built by `factory`
    pub fn build<F>(size: usize, mut factory: F) -> SessionResult<Self>
    where
        F: FnMut(usize) -> SessionResult<Box<dyn Session>>,
    {
        let sessions = (0..size)
            .map(&mut factory)
            .collect::<SessionResult<Vec<_>>>()?;
        Self::new(sessions)
    }

    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Number of sessions currently checked out
    pub fn leased(&self) -> usize {
        let state = self.inner.lock();
        if state.closed {
            return 0;
        }
        self.inner.size - state.available.len()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Leases a session, suspending until one is idle
    ///
    /// # Returns
    ///
    /// * `Ok(SessionLease)` - Exclusive access until the lease is dropped
    /// * `Err(SessionError::PoolClosed)` - `cleanup` has run
    pub async fn acquire(&self) -> SessionResult<SessionLease> {
        let permit = self
            .inner
            .permits
            .acquire()
            .await
            .map_err(|_| SessionError::PoolClosed)?;
        permit.forget();

        let mut state = self.inner.lock();
        if state.closed {
            return Err(SessionError::PoolClosed);
        }
        let slot = state
            .available
            .pop_front()
            .ok_or(SessionError::PoolClosed)?;
        let session = state.slots[slot].take().ok_or(SessionError::PoolClosed)?;
        drop(state);

        tracing::trace!("Leased session {} from slot {}", session.id(), slot);
        Ok(SessionLease {
            pool: Arc::clone(&self.inner),
            slot,
            session: Some(session),
        })
    }

    /// Returns a session to the pool; equivalent to dropping the lease
    pub fn release(&self, lease: SessionLease) {
        drop(lease);
    }

    /// Quits every session and closes the pool
    ///
    /// Idle sessions are quit here; sessions still leased are quit when their
    /// lease is dropped. Later `acquire` calls fail with `PoolClosed`.
    pub async fn cleanup(&self) {
        let idle: Vec<Box<dyn Session>> = {
            let mut state = self.inner.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.available.clear();
            state.slots.iter_mut().filter_map(Option::take).collect()
        };
        self.inner.permits.close();

        let checked_out = self.inner.size - idle.len();
        if checked_out > 0 {
            tracing::warn!(
                "Closing pool with {} session(s) still leased; they will quit on release",
                checked_out
            );
        }

        for mut session in idle {
            if let Err(e) = session.quit().await {
                tracing::warn!("Failed to quit session {}: {}", session.id(), e);
            }
        }
        tracing::debug!("Session pool closed");
    }
}

/// Exclusive, temporary ownership of one pooled session
///
/// Dropping the lease hands the session back, on every exit path.
pub struct SessionLease {
    pool: Arc<PoolInner>,
    slot: usize,
    session: Option<Box<dyn Session>>,
}

impl Deref for SessionLease {
    type Target = dyn Session;

    fn deref(&self) -> &Self::Target {
        match self.session.as_deref() {
            Some(session) => session,
            None => unreachable!("lease holds its session until dropped"),
        }
    }
}

impl DerefMut for SessionLease {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self.session.as_deref_mut() {
            Some(session) => session,
            None => unreachable!("lease holds its session until dropped"),
        }
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::trace!("Released session {} to slot {}", session.id(), self.slot);
            self.pool.give_back(self.slot, session);
        }
    }
}
