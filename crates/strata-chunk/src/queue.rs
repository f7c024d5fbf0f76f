//! FIFO work queue for light flood fills.

/// A chunk-local cell plus the light value carried by the work item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LightQueueItem {
    pub x: u8,
    pub y: u8,
    pub z: u8,
    pub value: u8,
}

impl LightQueueItem {
    #[inline]
    pub fn new(x: usize, y: usize, z: usize, value: u8) -> Self {
        debug_assert!(x < 16 && y < 16 && z < 16 && value <= 15);
        Self {
            x: x as u8,
            y: y as u8,
            z: z as u8,
            value,
        }
    }

    #[inline]
    pub fn pos(self) -> (usize, usize, usize) {
        (self.x as usize, self.y as usize, self.z as usize)
    }
}

/// Circular buffer that allocates on first push, doubles when full and
/// halves once occupancy falls to a quarter.
#[derive(Clone, Debug, Default)]
pub struct LightQueue {
    buf: Vec<LightQueueItem>,
    head: usize,
    len: usize,
}

impl LightQueue {
    pub const MIN_CAPACITY: usize = 16;

    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            head: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn push(&mut self, item: LightQueueItem) {
        if self.len == self.buf.len() {
            let cap = (self.buf.len() * 2).max(Self::MIN_CAPACITY);
            self.resize(cap);
        }
        let mask = self.buf.len() - 1;
        self.buf[(self.head + self.len) & mask] = item;
        self.len += 1;
    }

    pub fn pop(&mut self) -> Option<LightQueueItem> {
        if self.len == 0 {
            return None;
        }
        let mask = self.buf.len() - 1;
        let item = self.buf[self.head];
        self.head = (self.head + 1) & mask;
        self.len -= 1;
        let cap = self.buf.len();
        if cap > Self::MIN_CAPACITY && self.len <= cap / 4 {
            self.resize(cap / 2);
        }
        Some(item)
    }

    /// Drops all pending items and releases the buffer.
    pub fn clear(&mut self) {
        self.buf = Vec::new();
        self.head = 0;
        self.len = 0;
    }

    /// Items in FIFO order without consuming them.
    pub fn iter(&self) -> impl Iterator<Item = LightQueueItem> + '_ {
        let mask = self.buf.len().wrapping_sub(1);
        (0..self.len).map(move |i| self.buf[(self.head + i) & mask])
    }

    /// Removes and returns every pending item in FIFO order.
    pub fn take_all(&mut self) -> Vec<LightQueueItem> {
        let out: Vec<LightQueueItem> = self.iter().collect();
        self.clear();
        out
    }

    fn resize(&mut self, cap: usize) {
        debug_assert!(cap.is_power_of_two() && cap >= self.len);
        let mut next = vec![LightQueueItem::default(); cap];
        for (slot, item) in next.iter_mut().zip(self.iter()) {
            *slot = item;
        }
        self.buf = next;
        self.head = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(i: usize) -> LightQueueItem {
        LightQueueItem::new(i % 16, (i / 16) % 16, (i / 256) % 16, (i % 16) as u8)
    }

    #[test]
    fn allocates_lazily() {
        let mut q = LightQueue::new();
        assert_eq!(q.capacity(), 0);
        assert_eq!(q.pop(), None);
        q.push(item(1));
        assert_eq!(q.capacity(), LightQueue::MIN_CAPACITY);
    }

    #[test]
    fn fifo_across_wraparound_and_growth() {
        let mut q = LightQueue::new();
        for i in 0..10 {
            q.push(item(i));
        }
        for i in 0..6 {
            assert_eq!(q.pop(), Some(item(i)));
        }
        // head is now mid-buffer; pushing past capacity must keep order
        for i in 10..40 {
            q.push(item(i));
        }
        assert!(q.capacity() >= 34);
        for i in 6..40 {
            assert_eq!(q.pop(), Some(item(i)));
        }
        assert!(q.is_empty());
    }

    #[test]
    fn shrinks_when_sparse() {
        let mut q = LightQueue::new();
        for i in 0..256 {
            q.push(item(i));
        }
        assert_eq!(q.capacity(), 256);
        for _ in 0..250 {
            q.pop();
        }
        assert!(q.capacity() < 256);
        assert!(q.capacity() >= q.len());
        assert!(q.capacity() >= LightQueue::MIN_CAPACITY);
    }

    #[test]
    fn take_all_preserves_order() {
        let mut q = LightQueue::new();
        for i in 0..20 {
            q.push(item(i));
        }
        q.pop();
        let all = q.take_all();
        assert_eq!(all.len(), 19);
        assert_eq!(all[0], item(1));
        assert!(q.is_empty());
        assert_eq!(q.capacity(), 0);
    }
}
