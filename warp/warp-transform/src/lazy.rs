//! Single-builder lazy initialization.

use std::convert::Infallible;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// A lazily built value with a single-builder, many-reader discipline.
///
/// The cell moves through three states: `Uninitialized`, `Building`, and
/// `Ready`. The first reader to find the cell uninitialized becomes the
/// builder; readers arriving while a build is in flight block on a
/// condition variable until the value is ready. A failed build resets the
/// cell so a later caller can retry.
///
/// Readers share the finished value through an `Arc`, so a reader keeps a
/// consistent snapshot even if the owner later calls [`Lazy::clear`]
/// (which requires `&mut self` and therefore exclusive access).
///
/// # Example
///
/// ```
/// use warp_transform::Lazy;
///
/// let cell: Lazy<Vec<u32>> = Lazy::new();
/// let value = cell.get_or_build(|| vec![1, 2, 3]);
/// assert_eq!(*value, vec![1, 2, 3]);
///
/// // Subsequent reads reuse the built value.
/// let again = cell.get_or_build(|| unreachable!());
/// assert_eq!(*again, *value);
/// ```
pub struct Lazy<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
}

enum State<T> {
    Uninitialized,
    Building,
    Ready(Arc<T>),
}

impl<T> Lazy<T> {
    /// Create an empty cell.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(State::Uninitialized),
            ready: Condvar::new(),
        }
    }

    /// Create a cell already holding a value.
    #[must_use]
    pub fn ready(value: T) -> Self {
        Self {
            state: Mutex::new(State::Ready(Arc::new(value))),
            ready: Condvar::new(),
        }
    }

    /// Return the value, building it with `build` if absent.
    ///
    /// At most one caller runs `build`; concurrent callers block until the
    /// value is ready. The builder runs outside the lock.
    pub fn get_or_build(&self, build: impl FnOnce() -> T) -> Arc<T> {
        match self.get_or_try_build(|| Ok::<_, Infallible>(build())) {
            Ok(value) => value,
            Err(infallible) => match infallible {},
        }
    }

    /// Fallible form of [`Lazy::get_or_build`].
    ///
    /// On build failure the cell returns to `Uninitialized` and the error
    /// propagates to the caller that ran the builder; blocked readers wake
    /// and retry (one of them becomes the next builder).
    pub fn get_or_try_build<E>(&self, build: impl FnOnce() -> Result<T, E>) -> Result<Arc<T>, E> {
        let mut state = self.lock();
        loop {
            match &*state {
                State::Ready(value) => return Ok(Arc::clone(value)),
                State::Building => {
                    state = self
                        .ready
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                State::Uninitialized => {
                    *state = State::Building;
                    drop(state);

                    let result = build();

                    let mut state = self.lock();
                    return match result {
                        Ok(value) => {
                            let value = Arc::new(value);
                            *state = State::Ready(Arc::clone(&value));
                            self.ready.notify_all();
                            Ok(value)
                        }
                        Err(error) => {
                            *state = State::Uninitialized;
                            self.ready.notify_all();
                            Err(error)
                        }
                    };
                }
            }
        }
    }

    /// Return the value if it has already been built.
    ///
    /// Never blocks and never builds.
    #[must_use]
    pub fn peek(&self) -> Option<Arc<T>> {
        match &*self.lock() {
            State::Ready(value) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Drop the built value so the next reader rebuilds it.
    pub fn clear(&mut self) {
        *self.lock() = State::Uninitialized;
    }

    /// Replace the cell's value.
    pub fn set(&mut self, value: T) {
        *self.lock() = State::Ready(Arc::new(value));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State<T>> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for Lazy<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.lock() {
            State::Uninitialized => "Uninitialized",
            State::Building => "Building",
            State::Ready(_) => "Ready",
        };
        f.debug_struct("Lazy").field("state", &state).finish()
    }
}
