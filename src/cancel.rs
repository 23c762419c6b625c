//! Cooperative cancellation.
//!
//! A [`Canceller`] owns the flag; any number of [`CancelSignal`] clones
//! observe it. Drivers check the signal at the top of every iteration, and
//! pipes register a wake-up so that a blocked read or write returns
//! [`StreamError::Cancelled`] instead of waiting for data that will never
//! arrive.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::StreamError;

type Waker = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Wakers {
    next_id: u64,
    entries: HashMap<u64, Waker>,
}

struct CancelState {
    flag: AtomicBool,
    wakers: Mutex<Wakers>,
    /// Link to the parent signal for children made with [`CancelSignal::child`].
    _parent: Option<Registration>,
}

impl CancelState {
    fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
            wakers: Mutex::new(Wakers::default()),
            _parent: None,
        }
    }

    /// Sets the flag and runs every registered waker exactly once.
    fn fire(&self) -> bool {
        if self
            .flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        let wakers = std::mem::take(&mut self.wakers.lock().entries);
        for wake in wakers.into_values() {
            wake();
        }
        true
    }
}

/// Keeps a waker registered on a signal; dropping it unregisters the waker.
#[must_use = "dropping the registration unregisters the waker"]
pub(crate) struct Registration {
    state: Weak<CancelState>,
    id: Option<u64>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let Some(id) = self.id else { return };
        if let Some(state) = self.state.upgrade() {
            state.wakers.lock().entries.remove(&id);
        }
    }
}

/// The owning side of a cancellation flag.
///
/// There is exactly one `Canceller` per flag. Once [`cancel()`](Canceller::cancel)
/// has been called the flag never resets.
///
/// # Example
///
/// ```
/// use stream_pipe::Canceller;
///
/// let canceller = Canceller::new();
/// let signal = canceller.signal();
/// assert!(!signal.is_cancelled());
///
/// assert!(canceller.cancel());
/// assert!(signal.is_cancelled());
/// assert!(!canceller.cancel()); // already cancelled
/// ```
pub struct Canceller {
    signal: CancelSignal,
}

impl Canceller {
    /// Creates a canceller in the "not cancelled" state.
    pub fn new() -> Self {
        Self {
            signal: CancelSignal {
                inner: Arc::new(CancelState::new()),
            },
        }
    }

    /// Returns a signal observing this canceller's flag.
    pub fn signal(&self) -> CancelSignal {
        self.signal.clone()
    }

    /// Raises the flag.
    ///
    /// Returns `true` the first time, `false` if the flag was already set.
    pub fn cancel(&self) -> bool {
        self.signal.inner.fire()
    }

    /// Returns `true` once [`cancel()`](Canceller::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.signal.is_cancelled()
    }
}

impl Default for Canceller {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Canceller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canceller")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// A read-only view of a cancellation flag.
///
/// Cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct CancelSignal {
    inner: Arc<CancelState>,
}

impl CancelSignal {
    /// A signal that is never raised.
    pub fn never() -> Self {
        Self {
            inner: Arc::new(CancelState::new()),
        }
    }

    /// Returns `true` if the owning [`Canceller`] has fired.
    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::Acquire)
    }

    /// Returns `Err(StreamError::Cancelled)` if the flag is set.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Cancelled`] once the flag has been raised.
    pub fn check(&self) -> Result<(), StreamError> {
        if self.is_cancelled() {
            Err(StreamError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Derives a new [`Canceller`] that also fires when this signal fires.
    ///
    /// Cancelling the child does not affect this signal. The link is dropped
    /// together with the last handle to the child, so short-lived children do
    /// not pile up on a long-lived parent.
    pub fn child(&self) -> Canceller {
        let inner = Arc::new_cyclic(|weak: &Weak<CancelState>| {
            let weak = weak.clone();
            let link = self.on_cancel(move || {
                if let Some(state) = weak.upgrade() {
                    state.fire();
                }
            });
            CancelState {
                _parent: Some(link),
                ..CancelState::new()
            }
        });
        // The parent may have fired before the child could be upgraded.
        if self.is_cancelled() {
            inner.fire();
        }
        Canceller {
            signal: CancelSignal { inner },
        }
    }

    /// Registers `wake` to run once when the flag is raised.
    ///
    /// Runs `wake` immediately if the flag is already set. The waker stays
    /// registered until the returned [`Registration`] is dropped.
    pub(crate) fn on_cancel<F>(&self, wake: F) -> Registration
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut wakers = self.inner.wakers.lock();
        if self.is_cancelled() {
            drop(wakers);
            wake();
            return Registration {
                state: Weak::new(),
                id: None,
            };
        }
        let id = wakers.next_id;
        wakers.next_id += 1;
        wakers.entries.insert(id, Box::new(wake));
        Registration {
            state: Arc::downgrade(&self.inner),
            id: Some(id),
        }
    }

    #[cfg(test)]
    pub(crate) fn registered_wakers(&self) -> usize {
        self.inner.wakers.lock().entries.len()
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}

impl fmt::Debug for CancelSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelSignal")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
