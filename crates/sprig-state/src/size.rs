//! Cached encoded sizes.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Contents length of a composite node, stored by the size pass and read back
/// while writing so each sized block's prefix can be written before its body.
#[derive(Debug, Default)]
pub(crate) struct CachedSize {
    size: AtomicUsize,
}

impl CachedSize {
    #[inline]
    pub(crate) fn get(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set(&self, size: usize) {
        self.size.store(size, Ordering::Relaxed);
    }
}

impl Clone for CachedSize {
    fn clone(&self) -> Self {
        Self {
            size: AtomicUsize::new(self.get()),
        }
    }
}
