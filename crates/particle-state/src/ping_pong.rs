//! Double-buffered ownership of two state slots
//!
//! Exactly one slot is readable at any time; the other is the write target of
//! the next step. Roles only change through `swap`, which needs `&mut self`,
//! so a reader can never observe a half-swapped pair.

/// A pair of buffers with alternating read/write roles.
#[derive(Debug)]
pub struct PingPong<T> {
    slots: [T; 2],
    read: usize,
    swaps: u64,
}

impl<T> PingPong<T> {
    /// `first` starts as the read slot, `second` as the write target.
    pub fn new(first: T, second: T) -> Self {
        Self {
            slots: [first, second],
            read: 0,
            swaps: 0,
        }
    }

    /// The stable, fully written slot.
    pub fn read(&self) -> &T {
        &self.slots[self.read]
    }

    /// The slot the next step writes into.
    pub fn write(&self) -> &T {
        &self.slots[1 - self.read]
    }

    /// Borrow the read slot and the write slot at the same time.
    pub fn split_mut(&mut self) -> (&T, &mut T) {
        let (first, second) = self.slots.split_at_mut(1);
        if self.read == 0 {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        }
    }

    /// Flip roles: the slot just written becomes readable.
    pub fn swap(&mut self) {
        self.read = 1 - self.read;
        self.swaps += 1;
    }

    /// Index (0 or 1) of the current read slot.
    pub fn read_index(&self) -> usize {
        self.read
    }

    pub fn write_index(&self) -> usize {
        1 - self.read
    }

    /// Number of swaps since construction.
    pub fn swaps(&self) -> u64 {
        self.swaps
    }

    pub fn slots(&self) -> &[T; 2] {
        &self.slots
    }
}
