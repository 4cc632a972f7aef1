//! # **MemoryPool Module** - *Byte accounting for builders*
//!
//! Every builder draws its buffer growth from a [`MemoryPool`]. A pool with a
//! limit turns allocation pressure into a recoverable
//! [`BridgeError::ResourceExhausted`] instead of an abort, and its counter lets
//! callers observe that exported buffers are freed exactly once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use crate::enums::error::{BridgeError, Result};

static DEFAULT_POOL: OnceLock<Arc<MemoryPool>> = OnceLock::new();

/// # MemoryPool
///
/// Thread-safe byte budget.
///
/// `try_reserve` and `release` only move counters. The memory itself is
/// allocated by `Vec64` and returned to the pool when the owning allocation
/// drops.
#[derive(Debug)]
pub struct MemoryPool {
    limit: Option<usize>,
    allocated: AtomicUsize,
    peak: AtomicUsize,
}

impl MemoryPool {
    pub fn unbounded() -> Arc<Self> {
        Arc::new(Self { limit: None, allocated: AtomicUsize::new(0), peak: AtomicUsize::new(0) })
    }

    pub fn with_limit(bytes: usize) -> Arc<Self> {
        Arc::new(Self {
            limit: Some(bytes),
            allocated: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    /// Process-wide unbounded pool used when none is supplied.
    pub fn default_pool() -> Arc<Self> {
        DEFAULT_POOL.get_or_init(MemoryPool::unbounded).clone()
    }

    /// Charges `bytes` against the budget, or fails without side effects.
    pub fn try_reserve(&self, bytes: usize) -> Result<()> {
        let mut current = self.allocated.load(Ordering::Relaxed);
        loop {
            let next = current.checked_add(bytes).ok_or(BridgeError::ResourceExhausted {
                requested: bytes,
                allocated: current,
                limit: self.limit.unwrap_or(usize::MAX),
            })?;
            if let Some(limit) = self.limit {
                if next > limit {
                    return Err(BridgeError::ResourceExhausted {
                        requested: bytes,
                        allocated: current,
                        limit,
                    });
                }
            }
            match self.allocated.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    self.peak.fetch_max(next, Ordering::Relaxed);
                    return Ok(());
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Returns `bytes` previously charged with `try_reserve`.
    pub fn release(&self, bytes: usize) {
        let prev = self.allocated.fetch_sub(bytes, Ordering::AcqRel);
        debug_assert!(prev >= bytes, "memory pool released more than it reserved");
    }

    #[inline]
    pub fn bytes_allocated(&self) -> usize {
        self.allocated.load(Ordering::Acquire)
    }

    #[inline]
    pub fn peak_allocated(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_and_release() {
        let pool = MemoryPool::with_limit(128);
        pool.try_reserve(100).unwrap();
        assert_eq!(pool.bytes_allocated(), 100);

        let err = pool.try_reserve(64).unwrap_err();
        match err {
            BridgeError::ResourceExhausted { requested, allocated, limit } => {
                assert_eq!((requested, allocated, limit), (64, 100, 128));
            }
            other => panic!("unexpected {other:?}"),
        }
        // A failed reservation leaves the counter untouched
        assert_eq!(pool.bytes_allocated(), 100);

        pool.release(100);
        assert_eq!(pool.bytes_allocated(), 0);
        assert_eq!(pool.peak_allocated(), 100);
    }

    #[test]
    fn test_unbounded_and_default() {
        let pool = MemoryPool::unbounded();
        pool.try_reserve(1 << 40).unwrap();
        assert_eq!(pool.limit(), None);
        pool.release(1 << 40);

        let a = MemoryPool::default_pool();
        let b = MemoryPool::default_pool();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_concurrent_reservations_never_exceed_limit() {
        let pool = MemoryPool::with_limit(1000);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    let mut granted = 0;
                    for _ in 0..100 {
                        if pool.try_reserve(10).is_ok() {
                            granted += 10;
                        }
                    }
                    granted
                })
            })
            .collect();
        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 1000);
        assert_eq!(pool.bytes_allocated(), 1000);
    }
}
