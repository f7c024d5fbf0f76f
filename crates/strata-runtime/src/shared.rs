use std::fmt;
use std::sync::Arc;

type Release<T> = Box<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    value: T,
    release: Release<T>,
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        (self.release)(&self.value);
    }
}

/// Reference-counted resource whose release hook runs exactly once, on
/// whichever thread drops the last handle. The `Arc` strong count is the
/// owner count; its final decrement is ordered after every other owner's
/// last use of the value.
pub struct SharedHandle<T> {
    inner: Arc<Inner<T>>,
}

impl<T> SharedHandle<T> {
    pub fn new(value: T, release: impl Fn(&T) + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                value,
                release: Box::new(release),
            }),
        }
    }

    /// Another owner of the same resource.
    #[inline]
    pub fn acquire(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Gives up this owner's claim. Equivalent to dropping the handle.
    #[inline]
    pub fn release(self) {
        drop(self);
    }

    #[inline]
    pub fn get(&self) -> &T {
        &self.inner.value
    }

    /// Current number of owners; only a snapshot under concurrency.
    #[inline]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<T> Clone for SharedHandle<T> {
    fn clone(&self) -> Self {
        self.acquire()
    }
}

impl<T: fmt::Debug> fmt::Debug for SharedHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedHandle")
            .field("value", &self.inner.value)
            .field("refs", &self.ref_count())
            .finish()
    }
}
