use std::collections::BTreeMap;

/// Reorders completions back into enumeration order
///
/// Item `i` is handed out only after items `0..i`, however early it was
/// inserted. The cursor only moves forward.
#[derive(Debug)]
pub struct ReleaseBuffer<T> {
    slots: BTreeMap<usize, T>,
    next: usize,
}

impl<T> Default for ReleaseBuffer<T> {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
            next: 0,
        }
    }
}

impl<T> ReleaseBuffer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a completed item
    ///
    /// Indices already released, or already parked, are ignored and
    /// reported with `false`.
    pub fn insert(&mut self, index: usize, item: T) -> bool {
        if index < self.next || self.slots.contains_key(&index) {
            tracing::warn!(index, next = self.next, "[ReleaseBuffer] Duplicate completion ignored");
            return false;
        }
        self.slots.insert(index, item);
        true
    }

    /// Take the item at the cursor, if it has arrived
    pub fn pop_ready(&mut self) -> Option<T> {
        let item = self.slots.remove(&self.next)?;
        self.next += 1;
        Some(item)
    }

    /// Index of the next item to release
    pub fn cursor(&self) -> usize {
        self.next
    }

    /// Items parked ahead of the cursor
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
