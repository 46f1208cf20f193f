//! A monitor-synchronized histogram that can be shared between threads.
//!
//! Every operation on a [`SynchronizedHistogram`] serializes on an internal
//! mutex, so any number of threads may record into and query one instance
//! through a shared reference (typically behind an `Arc`). Recording stays
//! allocation-free; the cost added over the plain histogram is the lock.
//!
//! Merging two synchronized histograms acquires both monitors. To rule out
//! lock-order cycles when two threads merge the same pair in opposite
//! directions, every instance gets a process-unique, monotonically
//! increasing identity at construction, and [`SynchronizedHistogram::add`]
//! always locks the smaller identity first.
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//! use centile::SynchronizedHistogram;
//!
//! let h = Arc::new(SynchronizedHistogram::<u64>::new_with_max(60_000, 3).unwrap());
//! let handles: Vec<_> = (0..4)
//!     .map(|_| {
//!         let h = Arc::clone(&h);
//!         thread::spawn(move || {
//!             for v in 1..100 {
//!                 h.record(v).unwrap();
//!             }
//!         })
//!     })
//!     .collect();
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! assert_eq!(4 * 99, h.len());
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::counter::Counter;
use crate::errors::{AdditionError, CreationError, PercentileError, RecordError};
use crate::Histogram;

#[cfg(feature = "serialization")]
use crate::codec::{EncodeError, Encoder};
#[cfg(feature = "serialization")]
use std::io;

// Source of process-unique identities; only the uniqueness and monotonicity
// matter, so relaxed ordering is enough.
static NEXT_IDENTITY: AtomicU64 = AtomicU64::new(0);

/// A [`Histogram`] whose every operation runs under an internal monitor.
///
/// See the [module docs](self) for the locking discipline.
#[derive(Debug)]
pub struct SynchronizedHistogram<C: Counter> {
    identity: u64,
    inner: Mutex<Histogram<C>>,
}

impl<C: Counter> SynchronizedHistogram<C> {
    /// Construct a synchronized histogram covering `[1, high]`; see
    /// [`Histogram::new_with_max`].
    pub fn new_with_max(high: u64, digits: u8) -> Result<SynchronizedHistogram<C>, CreationError> {
        Histogram::new_with_max(high, digits).map(SynchronizedHistogram::from)
    }

    /// Construct a synchronized histogram with explicit bounds; see
    /// [`Histogram::new_with_bounds`].
    pub fn new_with_bounds(
        low: u64,
        high: u64,
        digits: u8,
    ) -> Result<SynchronizedHistogram<C>, CreationError> {
        Histogram::new_with_bounds(low, high, digits).map(SynchronizedHistogram::from)
    }

    /// This instance's process-unique identity, which fixes the lock
    /// acquisition order for [`add`](SynchronizedHistogram::add).
    pub fn identity(&self) -> u64 {
        self.identity
    }

    /// Record a single occurrence of `value` under the monitor.
    pub fn record(&self, value: u64) -> Result<(), RecordError> {
        self.lock().record(value)
    }

    /// Record `count` occurrences of `value` under the monitor.
    pub fn record_n(&self, value: u64, count: C) -> Result<(), RecordError> {
        self.lock().record_n(value, count)
    }

    /// Record with at-recording coordinated omission correction under the
    /// monitor; see [`Histogram::record_correct`]. The synthesized samples
    /// extend the critical section proportionally to `value / interval`.
    pub fn record_correct(&self, value: u64, interval: u64) -> Result<(), RecordError> {
        self.lock().record_correct(value, interval)
    }

    /// Record `count` occurrences with coordinated omission correction
    /// under the monitor; see [`Histogram::record_n_correct`].
    pub fn record_n_correct(&self, value: u64, count: C, interval: u64) -> Result<(), RecordError> {
        self.lock().record_n_correct(value, count, interval)
    }

    /// Merge another synchronized histogram into this one.
    ///
    /// Both monitors are held for the duration; they are acquired in
    /// ascending identity order, which (identities being unique) rules out
    /// deadlock between concurrent cross-merges. Merging an instance into
    /// itself snapshots the contents first and then doubles them.
    pub fn add(&self, other: &SynchronizedHistogram<C>) -> Result<(), AdditionError> {
        if self.identity == other.identity {
            let snapshot = self.lock().copy();
            return self.lock().add(&snapshot);
        }
        if self.identity < other.identity {
            let mut this = self.lock();
            let that = other.lock();
            this.add(&that)
        } else {
            let that = other.lock();
            let mut this = self.lock();
            this.add(&that)
        }
    }

    /// Merge a plain histogram into this one under the monitor.
    pub fn add_histogram(&self, other: &Histogram<C>) -> Result<(), AdditionError> {
        self.lock().add(other)
    }

    /// Clear counts and statistics under the monitor; see
    /// [`Histogram::reset`].
    pub fn reset(&self) {
        self.lock().reset()
    }

    /// Total number of samples recorded.
    pub fn len(&self) -> u64 {
        self.lock().len()
    }

    /// True when no samples have been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The highest recorded value; see [`Histogram::max`].
    pub fn max(&self) -> u64 {
        self.lock().max()
    }

    /// The lowest recorded value; see [`Histogram::min`].
    pub fn min(&self) -> u64 {
        self.lock().min()
    }

    /// Mean of the recorded values; see [`Histogram::mean`].
    pub fn mean(&self) -> f64 {
        self.lock().mean()
    }

    /// Value at a percentile; see [`Histogram::value_at_percentile`].
    pub fn value_at_percentile(&self, percentile: f64) -> Result<u64, PercentileError> {
        self.lock().value_at_percentile(percentile)
    }

    /// Run `f` with shared access to the histogram, holding the monitor for
    /// the duration. Iteration and other compound reads go through here so
    /// they observe a consistent snapshot.
    pub fn with<R>(&self, f: impl FnOnce(&Histogram<C>) -> R) -> R {
        f(&self.lock())
    }

    /// Run `f` with exclusive access to the histogram, holding the monitor
    /// for the duration.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Histogram<C>) -> R) -> R {
        f(&mut self.lock())
    }

    /// An unsynchronized copy of the current contents.
    pub fn snapshot(&self) -> Histogram<C> {
        self.lock().copy()
    }

    /// Encode the histogram under the monitor, so concurrent recording
    /// cannot tear the counts mid-frame.
    #[cfg(feature = "serialization")]
    pub fn encode<E: Encoder, W: io::Write>(
        &self,
        encoder: &mut E,
        writer: &mut W,
    ) -> Result<usize, EncodeError> {
        encoder.encode(&self.lock(), writer)
    }

    /// Unwrap into the plain histogram.
    pub fn into_inner(self) -> Histogram<C> {
        self.inner
            .into_inner()
            .expect("histogram mutex was poisoned")
    }

    fn lock(&self) -> MutexGuard<'_, Histogram<C>> {
        self.inner.lock().expect("histogram mutex was poisoned")
    }
}

impl<C: Counter> From<Histogram<C>> for SynchronizedHistogram<C> {
    fn from(h: Histogram<C>) -> Self {
        SynchronizedHistogram {
            identity: NEXT_IDENTITY.fetch_add(1, Ordering::Relaxed),
            inner: Mutex::new(h),
        }
    }
}

impl<C: Counter> Histogram<C> {
    /// Wrap this histogram in a [`SynchronizedHistogram`].
    pub fn into_sync(self) -> SynchronizedHistogram<C> {
        SynchronizedHistogram::from(self)
    }
}
